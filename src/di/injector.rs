use crate::di::container::{Container, ServiceFactory};
use crate::di::extractor::SpecificationExtractor;
use crate::di::injectable::{Constructor, Injectable};
use crate::di::resolver::{AnnotatedResolver, DependencyResolver};
use crate::error::{Result, WiredError};
use crate::spec::Signature;
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A constructible type or callable that describes its parameters with a [`Signature`].
pub trait Factory: Send + Sync {
    type Output;

    /// Used in error messages and logs.
    fn name(&self) -> &str;

    /// Declared parameters. An error here is reported as a type configuration failure.
    fn signature(&self) -> Result<Signature>;

    /// Build the output from the merged arguments.
    fn call(&self, kwargs: Kwargs) -> Result<Self::Output>;
}

/// The merged keyword arguments handed to a [`Factory`].
///
/// Accessors remove what they read, so [`Kwargs::finish`] can reject anything
/// the factory did not ask for.
pub struct Kwargs {
    factory: String,
    values: BTreeMap<String, Value>,
}

impl Kwargs {
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            values: BTreeMap::new(),
        }
    }

    /// Insert or replace an argument, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn take_value(&mut self, name: &str) -> Result<Value> {
        self.values.remove(name).ok_or_else(|| {
            WiredError::construction(&self.factory, format!("missing required argument `{name}`"))
        })
    }

    /// Take a shared handle, e.g. `Arc<dyn Greeter>`.
    pub fn take<T: ?Sized + Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>> {
        let value = self.take_value(name)?;
        value.downcast::<T>().ok_or_else(|| self.mismatch::<T>(name, &value))
    }

    /// Take an owned value: cloned when stored as `T`, deserialised when stored as JSON data.
    pub fn take_data<T>(&mut self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let value = self.take_value(name)?;
        self.convert(name, value)
    }

    /// Like [`Kwargs::take_data`], falling back to `default` when the argument is absent.
    pub fn take_data_or<T, D>(&mut self, name: &str, default: D) -> Result<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
        D: FnOnce() -> T,
    {
        match self.values.remove(name) {
            Some(value) => self.convert(name, value),
            None => Ok(default()),
        }
    }

    /// Fails if any argument is not a parameter of `signature`.
    ///
    /// Run before the factory body, so a rejected argument set never reaches it.
    pub fn check_declared(&self, signature: &Signature) -> Result<()> {
        let declared = signature
            .declarations()
            .iter()
            .map(|declaration| declaration.name.as_str())
            .collect::<HashSet<_>>();
        self.reject(self.names().filter(|name| !declared.contains(name)))
    }

    /// Fails if any argument was not consumed.
    pub fn finish(self) -> Result<()> {
        self.reject(self.names())
    }

    fn reject<'a>(&self, unexpected: impl Iterator<Item = &'a str>) -> Result<()> {
        let unexpected = unexpected
            .map(|name| format!("`{name}`"))
            .collect::<Vec<_>>();
        if unexpected.is_empty() {
            return Ok(());
        }
        Err(WiredError::construction(
            &self.factory,
            format!("unexpected argument(s) {}", unexpected.join(", ")),
        ))
    }

    fn convert<T>(&self, name: &str, value: Value) -> Result<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        if let Some(owned) = value.get::<T>() {
            return Ok(owned.clone());
        }
        match value.as_json() {
            Some(json) => serde_json::from_value(json.clone()).map_err(|e| {
                WiredError::construction(&self.factory, format!("argument `{name}`: {e}"))
            }),
            None => Err(self.mismatch::<T>(name, &value)),
        }
    }

    fn mismatch<T: ?Sized>(&self, name: &str, value: &Value) -> WiredError {
        WiredError::construction(
            &self.factory,
            format!(
                "argument `{name}` expected `{}`, got `{}`",
                std::any::type_name::<T>(),
                value.type_name()
            ),
        )
    }
}

impl fmt::Debug for Kwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kwargs")
            .field("factory", &self.factory)
            .field("values", &self.values)
            .finish()
    }
}

/// Wraps a factory and builds instances on demand by extracting, resolving,
/// merging and invoking.
///
/// Nothing is cached between invocations. An injector is immutable after
/// construction, so it can be shared and invoked from several threads as long
/// as the container and factory allow it.
///
/// # Example
/// ```
/// use wired_inject::prelude::*;
///
/// #[derive(Injectable)]
/// struct Lucky {
///     #[wired(capability = "Settings", key = "lucky.max")]
///     max: u32,
/// }
///
/// let mut registry = Registry::new();
/// registry.register_value(
///     Settings::from_json_str(r#"{"lucky.max": 7}"#)?.into_value(),
///     Capability::of::<Settings>(),
///     Registration::default(),
/// );
///
/// let lucky = Injector::<Constructor<Lucky>>::of().invoke(&registry.create_container())?;
/// assert_eq!(lucky.max, 7);
/// # Ok::<(), wired_inject::WiredError>(())
/// ```
pub struct Injector<F> {
    factory: F,
    presets: BTreeMap<String, Value>,
    extractor: SpecificationExtractor,
    resolver: Arc<dyn DependencyResolver>,
}

impl<T: Injectable> Injector<Constructor<T>> {
    /// Injector for a type deriving [`Injectable`].
    pub fn of() -> Self {
        Self::new(Constructor::new())
    }
}

impl<F: Factory> Injector<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            presets: BTreeMap::new(),
            extractor: SpecificationExtractor::default(),
            resolver: Arc::new(AnnotatedResolver),
        }
    }

    /// Preset argument; resolved dependencies of the same name take precedence.
    pub fn with_preset(mut self, name: impl Into<String>, value: Value) -> Self {
        self.presets.insert(name.into(), value);
        self
    }

    pub fn with_presets<I, K>(mut self, presets: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.presets
            .extend(presets.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    pub fn with_extractor(mut self, extractor: SpecificationExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_resolver<R: DependencyResolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Extract, resolve, merge with presets and invoke the factory exactly once.
    ///
    /// The factory is only called once every dependency resolved.
    pub fn invoke(&self, container: &dyn Container) -> Result<F::Output> {
        let signature = self.factory.signature()?;
        let specs = self
            .extractor
            .extract_signature(self.factory.name(), &signature)?;
        let resolved = self.resolver.resolve(container, &specs)?;

        let mut kwargs = Kwargs::new(self.factory.name());
        for (name, value) in &self.presets {
            kwargs.insert(name.clone(), value.clone());
        }
        for (name, value) in resolved {
            kwargs.insert(name, value);
        }

        tracing::debug!(
            factory = self.factory.name(),
            arguments = kwargs.len(),
            "Invoking factory"
        );
        kwargs.check_declared(&signature)?;
        self.factory.call(kwargs)
    }
}

impl<F> ServiceFactory for Injector<F>
where
    F: Factory,
    F::Output: Send + Sync + 'static,
{
    fn create(&self, container: &dyn Container) -> Result<Value> {
        self.invoke(container).map(Value::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::di::injectable::FnFactory;
    use crate::di::registry::{Registration, Registry};
    use crate::spec::{Capability, Declaration, Wired};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Settings;

    fn echo_factory(seen: Arc<Mutex<Vec<i64>>>) -> FnFactory<i64> {
        let signature = Signature::new()
            .declare(Declaration::new::<i64>("x").wired(Wired::of::<Settings>().key("x")));
        FnFactory::new("echo", signature, move |kwargs| {
            let x = kwargs.take_data::<i64>("x")?;
            seen.lock().unwrap().push(x);
            Ok(x)
        })
    }

    fn settings_registry(x: i64) -> Registry {
        let mut registry = Registry::new();
        registry.register_value(
            Value::data(json!({ "x": x })),
            Capability::of::<Settings>(),
            Registration::default(),
        );
        registry
    }

    #[test]
    fn test_resolved_values_override_presets() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let injector = Injector::new(echo_factory(seen.clone())).with_preset("x", Value::data(1));

        let result = injector.invoke(&settings_registry(2).create_container()).unwrap();
        assert_eq!(result, 2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_no_caching_between_invocations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let injector = Injector::new(echo_factory(seen.clone()));

        assert_eq!(injector.invoke(&settings_registry(3).create_container()).unwrap(), 3);
        assert_eq!(injector.invoke(&settings_registry(4).create_container()).unwrap(), 4);
        assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_failed_resolution_skips_factory() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let injector = Injector::new(echo_factory(seen.clone()));

        let err = injector.invoke(&Registry::new().create_container()).unwrap_err();
        assert!(matches!(err, WiredError::Resolution { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_preset_is_a_construction_error() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let injector =
            Injector::new(echo_factory(seen)).with_preset("surprise", Value::data(true));

        let err = injector
            .invoke(&settings_registry(1).create_container())
            .unwrap_err();
        assert!(matches!(err, WiredError::Construction { .. }));
    }

    #[test]
    fn test_undeclared_preset_never_enters_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let factory = FnFactory::new("side_effect", Signature::new(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let injector = Injector::new(factory).with_preset("unexpected", Value::data(1));

        let err = injector.invoke(&Registry::new().create_container()).unwrap_err();
        assert!(matches!(err, WiredError::Construction { .. }));
        assert!(err.to_string().contains("`unexpected`"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut kwargs = Kwargs::new("side_effect");
        kwargs.insert("unexpected", Value::data(1));
        assert!(injector.factory().call(kwargs).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_kwargs_accessors() {
        let mut kwargs = Kwargs::new("demo");
        kwargs.insert("name", Value::data("Ian"));
        kwargs.insert("count", Value::new(3_u32));
        kwargs.insert("shared", Value::new(String::from("shared")));

        assert_eq!(kwargs.take_data::<String>("name").unwrap(), "Ian");
        assert_eq!(kwargs.take_data::<u32>("count").unwrap(), 3);
        assert_eq!(*kwargs.take::<String>("shared").unwrap(), "shared");
        assert_eq!(kwargs.take_data_or::<u32, _>("absent", || 9).unwrap(), 9);
        assert!(matches!(
            kwargs.take_value("name"),
            Err(WiredError::Construction { .. })
        ));
        kwargs.finish().unwrap();
    }

    #[test]
    fn test_kwargs_type_mismatch() {
        let mut kwargs = Kwargs::new("demo");
        kwargs.insert("count", Value::data("three"));
        let err = kwargs.take_data::<u32>("count").unwrap_err();
        assert!(err.to_string().contains("count"));
    }
}
