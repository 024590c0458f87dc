use crate::di::injector::Factory;
use crate::error::{Result, WiredError};
use crate::spec::{Capability, Metadata, Signature, TypeRef, Wired};
use std::collections::{BTreeMap, HashMap};

/// Parameter name to its dependency specification.
pub type SpecificationMap = BTreeMap<String, Wired>;

/// Walks a factory's declarations and collects the dependency specifications
/// their metadata carries.
///
/// Deferred (by-name) type references are resolved through the alias table.
#[derive(Debug, Clone, Default)]
pub struct SpecificationExtractor {
    aliases: HashMap<String, Capability>,
}

impl SpecificationExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `alias` resolve to `T` in deferred declarations.
    pub fn with_alias<T: ?Sized + 'static>(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), Capability::of::<T>());
        self
    }

    pub fn extract<F: Factory + ?Sized>(&self, factory: &F) -> Result<SpecificationMap> {
        let signature = factory.signature()?;
        self.extract_signature(factory.name(), &signature)
    }

    /// Every declared type is resolved before any marker is read, so an
    /// unresolvable reference fails even on a parameter without markers.
    pub fn extract_signature(&self, factory: &str, signature: &Signature) -> Result<SpecificationMap> {
        signature.validate(factory)?;
        let declarations = signature
            .declarations()
            .iter()
            .map(|declaration| -> Result<_> {
                Ok((declaration, self.resolve_type(factory, &declaration.base)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut specs = SpecificationMap::new();
        for (declaration, base) in declarations {
            for metadata in &declaration.metadata {
                let spec = match metadata {
                    Metadata::Spec(spec) => spec.with_default_capability(base),
                    Metadata::Marker => Wired::default().with_default_capability(base),
                    Metadata::Other(_) => continue,
                };
                // Later markers overwrite earlier ones on the same parameter.
                if specs.insert(declaration.name.clone(), spec).is_some() {
                    tracing::trace!(
                        factory,
                        parameter = %declaration.name,
                        "Multiple dependency markers, keeping the last one"
                    );
                }
            }
        }

        tracing::trace!(factory, dependencies = specs.len(), "Extracted specifications");
        Ok(specs)
    }

    fn resolve_type(&self, factory: &str, base: &TypeRef) -> Result<Capability> {
        match base {
            TypeRef::Resolved(capability) => Ok(*capability),
            TypeRef::Deferred(name) => self.aliases.get(name).copied().ok_or_else(|| {
                WiredError::type_configuration(factory, format!("cannot resolve type reference `{name}`"))
            }),
        }
    }
}
