//! Runtime representation of resolved dependencies.
//!
//! A [`Value`] is what a container hands back and what the resolver projects.
//! It owns a shared handle to any `'static + Send + Sync` value and keeps the
//! identity of that handle, so a singleton resolved twice is still the same
//! object. Values that opt into [`Reflect`] can additionally be projected by
//! attribute, indexed by key, or called.

use crate::spec::Invocation;
use serde_json::Value as Json;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Reflection hooks used by attribute/key projection and invocation.
///
/// Every hook returns `None` when the value does not support it; the resolver
/// turns that into the matching access error.
pub trait Reflect: Any + Send + Sync {
    fn attribute(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }

    fn item(&self, key: &str) -> Option<Value> {
        let _ = key;
        None
    }

    /// `None` means "not callable"; `Some(Err(_))` means the call itself failed.
    fn call(&self, invocation: &Invocation) -> Option<anyhow::Result<Value>> {
        let _ = invocation;
        None
    }
}

/// A shared, type-erased handle to a resolved dependency.
#[derive(Clone)]
pub struct Value {
    // Always an `Arc<T>` boxed as `dyn Any`, so unsized `T` (trait objects) work too.
    inner: Arc<dyn Any + Send + Sync>,
    reflect: Option<Arc<dyn Reflect>>,
    address: usize,
    type_id: TypeId,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an existing shared handle without re-allocating, preserving its identity.
    ///
    /// `T` may be unsized, e.g. `Value::from_arc(greeter as Arc<dyn Greeter>)`.
    pub fn from_arc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            address: Arc::as_ptr(&value) as *const () as usize,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
            reflect: None,
        }
    }

    /// Wrap a value that supports projections.
    pub fn reflective<T: Reflect>(value: T) -> Self {
        let shared = Arc::new(value);
        let view: Arc<dyn Reflect> = shared.clone();
        Self {
            reflect: Some(view),
            ..Self::from_arc(shared)
        }
    }

    /// Attach a projection view to a value built with [`Value::from_arc`].
    ///
    /// Lets a service stay resolvable as its `dyn Trait` capability while its
    /// concrete type answers attribute projections.
    pub fn with_reflect(mut self, view: Arc<dyn Reflect>) -> Self {
        self.reflect = Some(view);
        self
    }

    /// Plain data; keys index into JSON objects and arrays. JSON has no attributes.
    pub fn data(value: impl Into<Json>) -> Self {
        Self::reflective(value.into())
    }

    /// A value that can be the target of an invocation transform.
    pub fn callable<F>(function: F) -> Self
    where
        F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::reflective(Callable(function))
    }

    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<Arc<T>>().map(|shared| shared.as_ref())
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn as_json(&self) -> Option<&Json> {
        self.get::<Json>()
    }

    pub fn reflection(&self) -> Option<&dyn Reflect> {
        self.reflect.as_deref()
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Identity comparison: both values point at the same underlying object.
    pub fn ptr_eq(a: &Value, b: &Value) -> bool {
        a.address == b.address && a.type_id == b.type_id
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Value::ptr_eq(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_json() {
            Some(json) => write!(f, "Value({json})"),
            None => write!(f, "Value(<{}>)", self.type_name),
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Value::data(value)
    }
}

impl Reflect for Json {
    fn item(&self, key: &str) -> Option<Value> {
        match self {
            Json::Object(map) => map.get(key).cloned().map(Value::data),
            Json::Array(items) => {
                let index = key.parse::<usize>().ok()?;
                items.get(index).cloned().map(Value::data)
            }
            _ => None,
        }
    }
}

struct Callable<F>(F);

impl<F> Reflect for Callable<F>
where
    F: Fn(&Invocation) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    fn call(&self, invocation: &Invocation) -> Option<anyhow::Result<Value>> {
        Some((self.0)(invocation))
    }
}
