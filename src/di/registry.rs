use crate::di::container::{ServiceContainer, ServiceFactory};
use crate::di::injector::{Factory, Injector};
use crate::error::Result;
use crate::module::Module;
use crate::spec::Capability;
use crate::value::{Reflect, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Where a registration applies: its name and, optionally, the context type it is limited to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub context: Option<Capability>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: None,
        }
    }

    /// Only applies when the lookup context is a `C`.
    pub fn for_context<C: ?Sized + 'static>(mut self) -> Self {
        self.context = Some(Capability::of::<C>());
        self
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct RegistrationKey {
    capability: Capability,
    name: String,
    context: Option<TypeId>,
}

impl RegistrationKey {
    pub(crate) fn new(capability: Capability, name: &str, context: Option<TypeId>) -> Self {
        Self {
            capability,
            name: name.to_string(),
            context,
        }
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.capability)
        } else {
            write!(f, "{}[{}]", self.capability, self.name)
        }
    }
}

#[derive(Clone)]
pub(crate) enum Entry {
    Singleton(Value),
    Factory(Arc<dyn ServiceFactory>),
}

/// Collects registrations and creates containers from them.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use wired_inject::{ContainerExt, Registration, Registry};
///
/// trait Greeter: Send + Sync {}
/// struct English;
/// impl Greeter for English {}
///
/// let mut registry = Registry::new();
/// registry.register_singleton(Arc::new(English) as Arc<dyn Greeter>, Registration::default());
///
/// let container = registry.create_container();
/// assert!(container.resolve::<dyn Greeter>().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    entries: HashMap<RegistrationKey, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory invoked lazily, at most once per container.
    pub fn register_factory<F>(
        &mut self,
        factory: F,
        capability: Capability,
        registration: Registration,
    ) -> &mut Self
    where
        F: ServiceFactory + 'static,
    {
        self.insert(capability, registration, Entry::Factory(Arc::new(factory)))
    }

    /// Register an injector for the capability `I`, converting what it builds with `cast`.
    ///
    /// `cast` is usually an unsizing coercion such as `|s| s as Arc<dyn Greeter>`.
    pub fn register_injector<F, I>(
        &mut self,
        injector: Injector<F>,
        cast: fn(Arc<F::Output>) -> Arc<I>,
        registration: Registration,
    ) -> &mut Self
    where
        F: Factory + 'static,
        F::Output: 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        let factory = move |container: &dyn crate::di::Container| -> Result<Value> {
            let instance = injector.invoke(container)?;
            Ok(Value::from_arc(cast(Arc::new(instance))))
        };
        self.register_factory(factory, Capability::of::<I>(), registration)
    }

    /// Like [`Registry::register_injector`], keeping the built instance's
    /// [`Reflect`] view so attribute projections reach it through `I`.
    pub fn register_reflective_injector<F, I>(
        &mut self,
        injector: Injector<F>,
        cast: fn(Arc<F::Output>) -> Arc<I>,
        registration: Registration,
    ) -> &mut Self
    where
        F: Factory + 'static,
        F::Output: Reflect,
        I: ?Sized + Send + Sync + 'static,
    {
        let factory = move |container: &dyn crate::di::Container| -> Result<Value> {
            let instance = Arc::new(injector.invoke(container)?);
            let view: Arc<dyn Reflect> = instance.clone();
            Ok(Value::from_arc(cast(instance)).with_reflect(view))
        };
        self.register_factory(factory, Capability::of::<I>(), registration)
    }

    /// Register an existing shared instance as the capability `I`.
    pub fn register_singleton<I>(&mut self, instance: Arc<I>, registration: Registration) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        self.register_value(Value::from_arc(instance), Capability::of::<I>(), registration)
    }

    /// Register an existing instance as the capability `I`, projectable through its [`Reflect`] view.
    pub fn register_reflective_singleton<T, I>(
        &mut self,
        instance: Arc<T>,
        cast: fn(Arc<T>) -> Arc<I>,
        registration: Registration,
    ) -> &mut Self
    where
        T: Reflect,
        I: ?Sized + Send + Sync + 'static,
    {
        let view: Arc<dyn Reflect> = instance.clone();
        let value = Value::from_arc(cast(instance)).with_reflect(view);
        self.register_value(value, Capability::of::<I>(), registration)
    }

    /// Register a ready-made value, e.g. reflective settings.
    pub fn register_value(
        &mut self,
        value: Value,
        capability: Capability,
        registration: Registration,
    ) -> &mut Self {
        self.insert(capability, registration, Entry::Singleton(value))
    }

    pub fn install<M: Module>(&mut self) -> Result<&mut Self> {
        M::register(self)?;
        Ok(self)
    }

    pub fn contains(&self, capability: &Capability, name: &str) -> bool {
        self.entries
            .contains_key(&RegistrationKey::new(*capability, name, None))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create a container over a snapshot of the current registrations.
    pub fn create_container(&self) -> ServiceContainer {
        ServiceContainer::new(Arc::new(self.entries.clone()))
    }

    fn insert(&mut self, capability: Capability, registration: Registration, entry: Entry) -> &mut Self {
        let key = RegistrationKey::new(
            capability,
            &registration.name,
            registration.context.map(|context| context.id()),
        );
        if self.entries.insert(key.clone(), entry).is_some() {
            tracing::debug!(service = %key, "Replacing existing registration");
        }
        self
    }
}
