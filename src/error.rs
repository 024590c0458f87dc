use thiserror::Error;

pub type Result<T> = std::result::Result<T, WiredError>;

#[derive(Debug, Error)]
pub enum WiredError {
    /// A factory's declared types could not be resolved.
    #[error("Invalid type configuration for `{factory}`: {message}")]
    TypeConfiguration { factory: String, message: String },

    /// The container has no registration for the requested capability/name pair.
    #[error("No registration for capability `{capability}` with name {name:?}")]
    Resolution { capability: String, name: String },

    #[error("Failed to downcast `{found}` to `{expected}`")]
    DowncastFailed { expected: String, found: String },

    #[error("`{type_name}` has no attribute `{attribute}`")]
    AttributeAccess { type_name: String, attribute: String },

    #[error("`{type_name}` has no key {key:?}")]
    KeyAccess { type_name: String, key: String },

    #[error("Failed to invoke `{type_name}`: {message}")]
    Invocation { type_name: String, message: String },

    /// The factory rejected the merged argument set.
    #[error("Failed to construct `{factory}`: {message}")]
    Construction { factory: String, message: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Failed to read settings from {path}: {source}")]
    SettingsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed settings: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

impl WiredError {
    pub fn type_configuration(factory: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeConfiguration {
            factory: factory.into(),
            message: message.into(),
        }
    }

    pub fn construction(factory: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            factory: factory.into(),
            message: message.into(),
        }
    }

    pub fn invocation(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}
