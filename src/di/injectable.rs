use crate::di::injector::{Factory, Kwargs};
use crate::error::Result;
use crate::spec::Signature;
use std::marker::PhantomData;

/// A type whose constructor can be driven by an [`crate::Injector`].
///
/// This trait is typically implemented automatically via `#[derive(Injectable)]`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use wired_inject::Injectable;
///
/// trait Clock: Send + Sync {}
///
/// #[derive(Injectable)]
/// pub struct HelloService {
///     // Resolved from the container as `dyn Clock`
///     #[wired]
///     clock: Arc<dyn Clock>,
///     // Supplied by a preset, or defaulted
///     #[param(default = "String::from(\"Hello\")")]
///     greeting: String,
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Declared fields, with their dependency markers.
    fn signature() -> Result<Signature>;

    /// Build an instance from the merged arguments.
    ///
    /// # Errors
    /// Returns a construction error if an argument is missing, unexpected, or of the wrong type.
    fn construct(kwargs: Kwargs) -> Result<Self>;
}

/// [`Factory`] adapter for an [`Injectable`] type.
pub struct Constructor<T>(PhantomData<fn() -> T>);

impl<T> Constructor<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Constructor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Injectable> Factory for Constructor<T> {
    type Output = T;

    fn name(&self) -> &str {
        std::any::type_name::<T>()
    }

    fn signature(&self) -> Result<Signature> {
        T::signature()
    }

    fn call(&self, kwargs: Kwargs) -> Result<T> {
        T::construct(kwargs)
    }
}

type FactoryFn<T> = Box<dyn Fn(&mut Kwargs) -> Result<T> + Send + Sync>;

/// A plain callable with an explicitly declared signature.
///
/// Arguments the function does not take are rejected after it returns.
///
/// # Example
/// ```
/// use wired_inject::{Declaration, FnFactory, Settings, Signature, Wired};
///
/// let build_lucky = FnFactory::new(
///     "build_lucky_service",
///     Signature::new().declare(
///         Declaration::new::<u32>("max_number")
///             .wired(Wired::of::<Settings>().key("hello.lucky_max_number")),
///     ),
///     |kwargs| kwargs.take_data::<u32>("max_number"),
/// );
/// # let _ = build_lucky;
/// ```
pub struct FnFactory<T> {
    name: String,
    signature: Signature,
    function: FactoryFn<T>,
}

impl<T> FnFactory<T> {
    pub fn new<F>(name: impl Into<String>, signature: Signature, function: F) -> Self
    where
        F: Fn(&mut Kwargs) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            function: Box::new(function),
        }
    }
}

impl<T> Factory for FnFactory<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Result<Signature> {
        Ok(self.signature.clone())
    }

    fn call(&self, mut kwargs: Kwargs) -> Result<T> {
        kwargs.check_declared(&self.signature)?;
        let output = (self.function)(&mut kwargs)?;
        kwargs.finish()?;
        Ok(output)
    }
}
