use crate::di::registry::{Entry, RegistrationKey};
use crate::error::{Result, WiredError};
use crate::spec::Capability;
use crate::value::Value;
use dashmap::DashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lookup-by-capability service locator consumed by the resolver.
///
/// Implementations must be safe for concurrent use if the same injector is
/// invoked from several threads; the engine itself holds no mutable state.
pub trait Container: Send + Sync {
    /// Fails with [`WiredError::Resolution`] when nothing is registered for
    /// `capability` under `name`.
    fn get(&self, capability: &Capability, name: &str, context: Option<&Value>) -> Result<Value>;
}

/// Typed conveniences on top of [`Container::get`].
pub trait ContainerExt: Container {
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_named::<T>("")
    }

    fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.get(&Capability::of::<T>(), name, None)?;
        value
            .downcast::<T>()
            .ok_or_else(|| WiredError::DowncastFailed {
                expected: std::any::type_name::<T>().to_string(),
                found: value.type_name().to_string(),
            })
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}

/// Something that can produce a service instance given a container.
///
/// This is the shape registries accept: [`crate::Injector`] implements it, as
/// does any `Fn(&dyn Container) -> Result<Value>`.
pub trait ServiceFactory: Send + Sync {
    fn create(&self, container: &dyn Container) -> Result<Value>;
}

impl<F> ServiceFactory for F
where
    F: Fn(&dyn Container) -> Result<Value> + Send + Sync,
{
    fn create(&self, container: &dyn Container) -> Result<Value> {
        self(container)
    }
}

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static BUILDING: RefCell<Vec<(u64, RegistrationKey)>> = const { RefCell::new(Vec::new()) };
}

/// Thread-safe container created by [`crate::Registry::create_container`].
///
/// Singletons are shared by every container of the registry. Instances built by
/// factories are cached per container, so two containers never share them.
pub struct ServiceContainer {
    id: u64,
    entries: Arc<HashMap<RegistrationKey, Entry>>,
    instances: DashMap<RegistrationKey, Value>,
}

impl ServiceContainer {
    pub(crate) fn new(entries: Arc<HashMap<RegistrationKey, Entry>>) -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            entries,
            instances: DashMap::new(),
        }
    }

    pub fn contains(&self, capability: &Capability, name: &str) -> bool {
        self.entries
            .contains_key(&RegistrationKey::new(*capability, name, None))
    }

    /// Number of factory-built instances cached so far.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn lookup(
        &self,
        capability: &Capability,
        name: &str,
        context: Option<&Value>,
    ) -> Option<(&RegistrationKey, &Entry)> {
        let contextual = context.and_then(|context| {
            let key = RegistrationKey::new(*capability, name, Some(context.type_id()));
            self.entries.get_key_value(&key)
        });
        contextual.or_else(|| {
            self.entries
                .get_key_value(&RegistrationKey::new(*capability, name, None))
        })
    }

    fn instantiate(&self, key: &RegistrationKey, entry: &Entry) -> Result<Value> {
        let factory = match entry {
            Entry::Singleton(value) => return Ok(value.clone()),
            Entry::Factory(factory) => factory,
        };

        if let Some(cached) = self.instances.get(key) {
            return Ok(cached.value().clone());
        }

        // No map guard may be held here: the factory re-enters `get`.
        let _building = Building::enter(self.id, key)?;
        tracing::debug!(service = %key, "Creating service instance");
        let created = factory.create(self)?;

        Ok(self.instances.entry(key.clone()).or_insert(created).value().clone())
    }
}

impl Container for ServiceContainer {
    fn get(&self, capability: &Capability, name: &str, context: Option<&Value>) -> Result<Value> {
        let Some((key, entry)) = self.lookup(capability, name, context) else {
            tracing::warn!(capability = %capability, name, "No registration found");
            return Err(WiredError::Resolution {
                capability: capability.name().to_string(),
                name: name.to_string(),
            });
        };
        self.instantiate(key, entry)
    }
}

/// Marks a service as under construction on this thread for the guard's lifetime.
struct Building;

impl Building {
    fn enter(container: u64, key: &RegistrationKey) -> Result<Self> {
        BUILDING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack
                .iter()
                .position(|(owner, pending)| *owner == container && pending == key)
            {
                let cycle = stack[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == container)
                    .map(|(_, pending)| pending.to_string())
                    .chain(std::iter::once(key.to_string()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(WiredError::CircularDependency { cycle });
            }
            stack.push((container, key.clone()));
            Ok(Building)
        })
    }
}

impl Drop for Building {
    fn drop(&mut self) {
        BUILDING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
