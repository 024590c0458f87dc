use crate::di::container::Container;
use crate::di::extractor::SpecificationMap;
use crate::error::{Result, WiredError};
use crate::spec::Wired;
use crate::value::Value;
use std::collections::BTreeMap;

/// Parameter name to its final, transformed value.
pub type ResolvedValues = BTreeMap<String, Value>;

/// Turns specifications into values using a container.
pub trait DependencyResolver: Send + Sync {
    /// # Errors
    /// Propagates the first lookup, projection or invocation failure unchanged.
    fn resolve(&self, container: &dyn Container, specs: &SpecificationMap) -> Result<ResolvedValues>;
}

/// Resolves specifications in the fixed order lookup, attribute, key, call.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotatedResolver;

impl AnnotatedResolver {
    pub fn resolve_one(&self, container: &dyn Container, parameter: &str, spec: &Wired) -> Result<Value> {
        let capability = spec.target().ok_or_else(|| {
            WiredError::type_configuration(
                parameter,
                "specification has no capability; extract it from a declaration first",
            )
        })?;
        tracing::debug!(
            parameter,
            capability = %capability,
            name = %spec.name,
            "Resolving dependency"
        );
        let mut value = container.get(&capability, &spec.name, spec.context.as_ref())?;

        if let Some(attribute) = &spec.attr {
            let projected = value.reflection().and_then(|r| r.attribute(attribute));
            value = projected.ok_or_else(|| WiredError::AttributeAccess {
                type_name: value.type_name().to_string(),
                attribute: attribute.clone(),
            })?;
        }

        if let Some(key) = &spec.key {
            let projected = value.reflection().and_then(|r| r.item(key));
            value = projected.ok_or_else(|| WiredError::KeyAccess {
                type_name: value.type_name().to_string(),
                key: key.clone(),
            })?;
        }

        if let Some(invocation) = &spec.invocation {
            let called = match value.reflection().and_then(|r| r.call(invocation)) {
                Some(Ok(result)) => result,
                Some(Err(e)) => return Err(WiredError::invocation(value.type_name(), format!("{e:#}"))),
                None => return Err(WiredError::invocation(value.type_name(), "value is not callable")),
            };
            value = called;
        }

        Ok(value)
    }
}

impl DependencyResolver for AnnotatedResolver {
    fn resolve(&self, container: &dyn Container, specs: &SpecificationMap) -> Result<ResolvedValues> {
        specs
            .iter()
            .map(|(parameter, spec)| {
                let value = self.resolve_one(container, parameter, spec)?;
                Ok((parameter.clone(), value))
            })
            .collect()
    }
}
