use proc_macro::TokenStream;

mod injectable;
mod module;

/// Derive macro describing a struct's fields as injectable parameters
///
/// Fields marked `#[wired]` are resolved from the container as their own
/// type (the `T` of an `Arc<T>` field). `#[wired(...)]` configures the lookup
/// and the transforms applied after it; when a field carries several markers
/// the last one wins. Unmarked fields are ordinary parameters, supplied by the
/// injector's presets or by `#[param(default)]`.
///
/// `#[wired(context = "expr")]` passes the `Value` the expression evaluates
/// to as the lookup context.
///
/// The derive also implements `WiredService`, registering the struct under
/// `#[service(capability = "...", name = "...", context = "...")]` or, by
/// default, under its own type. `#[service(reflect)]` keeps the instance's
/// `Reflect` view for attribute projections, and
/// `#[service(presets(field = "expr"))]` presets data arguments at
/// registration.
///
/// # Example
/// ```ignore
/// use std::sync::Arc;
/// use wired_inject::{Injectable, Settings};
///
/// pub trait Hello: Send + Sync {}
///
/// #[derive(Injectable)]
/// #[service(capability = "dyn Hello", name = "fancy")]
/// pub struct FancyHello {
///     #[wired]
///     hello: Arc<dyn Hello>,
///     #[wired(capability = "Settings", key = "hello.prefix")]
///     prefix: String,
///     #[param(default = "String::from(\"And good day to you!\")")]
///     suffix: String,
/// }
///
/// impl Hello for FancyHello {}
/// ```
#[proc_macro_derive(Injectable, attributes(wired, param, service))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    injectable::derive_injectable(input)
}

/// Attribute macro grouping services into a module
///
/// # Example
/// ```ignore
/// use wired_inject::{module, Injectable};
///
/// #[derive(Injectable)]
/// pub struct NowService;
///
/// #[module(services = [NowService])]
/// pub struct TimeModule;
///
/// #[module(imports = [TimeModule])]
/// pub struct AppModule;
/// ```
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_attribute(attr, item)
}
