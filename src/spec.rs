//! Declarative dependency specifications and the annotated declarations that carry them.
//!
//! A factory describes itself as a [`Signature`]: one [`Declaration`] per
//! parameter, each pairing a base capability with an ordered list of
//! [`Metadata`]. A [`Wired`] value inside that list (or the bare
//! [`Metadata::Marker`]) marks the parameter as a dependency.

use crate::error::{Result, WiredError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An abstract capability, identified by Rust type identity.
///
/// Usually a trait object (`Capability::of::<dyn Greeter>()`), but any
/// `'static` type works, e.g. `Capability::of::<Settings>()`.
#[derive(Clone, Copy)]
pub struct Capability {
    id: TypeId,
    name: &'static str,
}

impl Capability {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Arguments for the final "call the resolved value" stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    #[serde(default)]
    pub args: Vec<Json>,
    #[serde(default)]
    pub kwargs: Map<String, Json>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Json>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Json>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.kwargs.get(name)
    }
}

/// Immutable recipe for obtaining and transforming one dependency.
///
/// Stages run in a fixed order: lookup (`capability`, `name`, `context`),
/// then `attr`, then `key`, then `invocation`. Every stage after the lookup
/// is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wired {
    pub capability: Option<Capability>,
    pub name: String,
    pub context: Option<Value>,
    pub attr: Option<String>,
    pub key: Option<String>,
    pub invocation: Option<Invocation>,
}

impl Wired {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Wired::new().capability::<T>()`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new().capability::<T>()
    }

    pub fn capability<T: ?Sized + 'static>(self) -> Self {
        self.with_capability(Capability::of::<T>())
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Call the looked-up (and projected) value with `invocation`.
    ///
    /// Presence decides: an empty [`Invocation`] still triggers a call with
    /// no arguments. Leave the stage unset to skip the call.
    pub fn call(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// A copy whose capability falls back to `base` when unset.
    pub fn with_default_capability(&self, base: Capability) -> Self {
        let mut spec = self.clone();
        spec.capability.get_or_insert(base);
        spec
    }

    /// The capability to look up. Only `None` before extraction has normalised the spec.
    pub fn target(&self) -> Option<Capability> {
        self.capability
    }
}

/// One metadata value attached to a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    /// An explicit specification.
    Spec(Wired),
    /// A bare reference to the specification type: "use defaults".
    Marker,
    /// Anything else. Ignored by extraction.
    Other(Value),
}

impl From<Wired> for Metadata {
    fn from(spec: Wired) -> Self {
        Metadata::Spec(spec)
    }
}

/// The declared type of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Resolved(Capability),
    /// A by-name reference, resolved by the extractor's alias table.
    Deferred(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub base: TypeRef,
    pub metadata: Vec<Metadata>,
}

impl Declaration {
    pub fn new<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: TypeRef::Resolved(Capability::of::<T>()),
            metadata: Vec::new(),
        }
    }

    pub fn deferred(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: TypeRef::Deferred(type_name.into()),
            metadata: Vec::new(),
        }
    }

    pub fn annotate(mut self, metadata: impl Into<Metadata>) -> Self {
        self.metadata.push(metadata.into());
        self
    }

    pub fn wired(self, spec: Wired) -> Self {
        self.annotate(Metadata::Spec(spec))
    }

    pub fn marker(self) -> Self {
        self.annotate(Metadata::Marker)
    }
}

/// The declared parameters of a factory, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    declarations: Vec<Declaration>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Parameter names must be unique, as they would be in any function signature.
    pub fn validate(&self, factory: &str) -> Result<()> {
        let mut seen = HashSet::new();
        for declaration in &self.declarations {
            if !seen.insert(declaration.name.as_str()) {
                return Err(WiredError::type_configuration(
                    factory,
                    format!("parameter `{}` is declared more than once", declaration.name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}
    struct Settings;

    #[test]
    fn test_capability_identity() {
        assert_eq!(Capability::of::<dyn Greeter>(), Capability::of::<dyn Greeter>());
        assert_ne!(Capability::of::<dyn Greeter>(), Capability::of::<Settings>());
        assert!(Capability::of::<Settings>().name().ends_with("Settings"));
    }

    #[test]
    fn test_default_spec_uses_empty_name() {
        let spec = Wired::default();
        assert_eq!(spec.name, "");
        assert!(spec.capability.is_none());
        assert!(spec.invocation.is_none());
    }

    #[test]
    fn test_default_capability_only_fills_unset() {
        let base = Capability::of::<dyn Greeter>();
        assert_eq!(Wired::new().with_default_capability(base).target(), Some(base));

        let explicit = Wired::of::<Settings>().with_default_capability(base);
        assert_eq!(explicit.target(), Some(Capability::of::<Settings>()));
    }

    #[test]
    fn test_duplicate_parameters_are_rejected() {
        let signature = Signature::new()
            .declare(Declaration::new::<i64>("x"))
            .declare(Declaration::new::<String>("x"));
        let err = signature.validate("build").unwrap_err();
        assert!(matches!(err, WiredError::TypeConfiguration { .. }));
    }
}
