//! # wired-inject
//!
//! Annotation-driven dependency resolution for Rust.
//!
//! A factory declares, next to each parameter, *which* capability it needs
//! and *how* to massage it after lookup. The engine runs three stages:
//!
//! 1. **Extraction**: [`SpecificationExtractor`] walks the factory's
//!    [`Signature`] and collects one [`Wired`] specification per marked
//!    parameter (the last marker on a parameter wins).
//! 2. **Resolution**: [`AnnotatedResolver`] looks each capability up in a
//!    [`Container`], then applies the optional attribute projection, key
//!    projection and invocation, in that order.
//! 3. **Invocation**: [`Injector`] merges the resolved values over its preset
//!    arguments and calls the factory exactly once.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use wired_inject::prelude::*;
//!
//! // 1. Capabilities are plain traits
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! pub struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello {name}")
//!     }
//! }
//!
//! // 2. Declare dependencies on the fields of a service
//! #[derive(Injectable)]
//! pub struct Welcome {
//!     #[wired]
//!     greeter: Arc<dyn Greeter>,
//!     #[wired(capability = "Settings", key = "welcome.name")]
//!     name: String,
//! }
//!
//! // 3. Populate a registry and build
//! let mut registry = Registry::new();
//! registry
//!     .register_singleton(Arc::new(English) as Arc<dyn Greeter>, Registration::default())
//!     .register_value(
//!         Settings::from_json_str(r#"{"welcome.name": "Ian"}"#)?.into_value(),
//!         Capability::of::<Settings>(),
//!         Registration::default(),
//!     );
//!
//! let welcome = Injector::<Constructor<Welcome>>::of().invoke(&registry.create_container())?;
//! assert_eq!(welcome.greeter.greet(&welcome.name), "Hello Ian");
//! # Ok::<(), wired_inject::WiredError>(())
//! ```

extern crate self as wired_inject;

pub mod config;
pub mod di;
pub mod error;
pub mod module;
pub mod spec;
pub mod value;

// Re-export core types
pub use config::Settings;
pub use di::{
    AnnotatedResolver, Constructor, Container, ContainerExt, DependencyResolver, Factory,
    FnFactory, Injectable, Injector, Kwargs, Registration, Registry, ResolvedValues,
    ServiceContainer, ServiceFactory, SpecificationExtractor, SpecificationMap,
};
pub use error::{Result, WiredError};
pub use module::{Module, WiredService};
pub use spec::{Capability, Declaration, Invocation, Metadata, Signature, TypeRef, Wired};
pub use value::{Reflect, Value};

// Re-export macros
pub use wired_inject_macro::{Injectable, module};

#[doc(hidden)]
pub mod __private {
    use crate::error::{Result, WiredError};
    use crate::spec::Invocation;

    pub use serde_json;

    /// Build the invocation stage from the JSON literals of a `#[wired(args, kwargs)]` attribute.
    pub fn parse_invocation(factory: &str, args: Option<&str>, kwargs: Option<&str>) -> Result<Invocation> {
        let malformed = |e: serde_json::Error| {
            WiredError::type_configuration(factory, format!("malformed invocation arguments: {e}"))
        };
        let mut invocation = Invocation::new();
        if let Some(args) = args {
            invocation.args = serde_json::from_str(args).map_err(malformed)?;
        }
        if let Some(kwargs) = kwargs {
            invocation.kwargs = serde_json::from_str(kwargs).map_err(malformed)?;
        }
        Ok(invocation)
    }
}

/// Prelude module for convenient imports
///
/// ```
/// use wired_inject::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::di::{
        Constructor, Container, ContainerExt, Factory, FnFactory, Injector, Kwargs, Registration,
        Registry, ServiceContainer,
    };
    pub use crate::error::{Result, WiredError};
    pub use crate::module::{Module, WiredService};
    pub use crate::spec::{Capability, Declaration, Invocation, Signature, Wired};
    pub use crate::value::{Reflect, Value};
    pub use crate::{Injectable, module};
    pub use std::sync::Arc;
}
