use crate::di::Registry;
use crate::error::Result;

/// A group of services registered together.
///
/// Modules are typically defined using the `#[module]` macro, which
/// implements this trait by registering each listed service and imported
/// module. Installing modules is the one step that populates a registry;
/// nothing is discovered at resolution time.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use wired_inject::prelude::*;
///
/// pub trait Clock: Send + Sync {}
///
/// #[derive(Injectable)]
/// #[service(capability = "dyn Clock")]
/// pub struct SystemClock;
///
/// impl Clock for SystemClock {}
///
/// #[module(services = [SystemClock])]
/// pub struct AppModule;
///
/// let container = AppModule::create_container()?;
/// assert!(container.resolve::<dyn Clock>().is_ok());
/// # Ok::<(), wired_inject::WiredError>(())
/// ```
pub trait Module {
    fn register(registry: &mut Registry) -> Result<()>;
}

/// A factory that knows the capability and name it should be registered under.
///
/// Implemented by `#[derive(Injectable)]`; `#[service(...)]` picks the
/// capability, name and context, otherwise the struct registers as itself.
pub trait WiredService {
    fn register(registry: &mut Registry) -> Result<()>;
}
