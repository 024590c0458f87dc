use crate::error::{Result, WiredError};
use crate::value::{Reflect, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::env;
use std::path::Path;

/// Application settings, usually registered as a singleton under
/// `Capability::of::<Settings>()` and read through key projections.
///
/// Keys are flat strings such as `"hello.prefix"`. A lookup tries the exact
/// key first and then walks nested objects along the dots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Json>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object.
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| WiredError::SettingsIo {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loading settings");
        Self::from_json_str(&source)
    }

    /// Collect `PREFIX_SECTION__NAME=value` variables as `section.name`.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, env::vars())
    }

    /// Like [`Settings::from_env`] over an explicit set of variables.
    ///
    /// Values are parsed as JSON when possible and kept as strings otherwise.
    pub fn from_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}_", prefix.to_uppercase());
        let mut settings = Self::new();
        for (name, raw) in vars {
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let key = rest.to_lowercase().replace("__", ".");
            let value = serde_json::from_str::<Json>(&raw).unwrap_or(Json::String(raw));
            settings.values.insert(key, value);
        }
        settings
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Json>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Overlay `other` on top of these settings; its keys win.
    pub fn merge(&mut self, other: Settings) -> &mut Self {
        self.values.extend(other.values);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        let mut segments = key.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(WiredError::from)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Wrap as a reflective [`Value`] ready for registration.
    pub fn into_value(self) -> Value {
        Value::reflective(self)
    }
}

impl Reflect for Settings {
    fn item(&self, key: &str) -> Option<Value> {
        self.get(key).cloned().map(Value::data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exact_key_before_dotted_path() {
        let settings = Settings::from_json_str(
            r#"{"hello.prefix": "flat", "hello": {"prefix": "nested", "suffix": "bye"}}"#,
        )
        .unwrap();
        assert_eq!(settings.get("hello.prefix"), Some(&json!("flat")));
        assert_eq!(settings.get("hello.suffix"), Some(&json!("bye")));
        assert_eq!(settings.get("hello.missing"), None);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = Settings::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, WiredError::SettingsFormat(_)));
    }

    #[test]
    fn test_env_overlay() {
        let vars = vec![
            ("WIRED_HELLO__PREFIX".to_string(), "Howdy".to_string()),
            ("WIRED_HELLO__LUCKY_MAX_NUMBER".to_string(), "999".to_string()),
            ("OTHER_VALUE".to_string(), "ignored".to_string()),
        ];
        let mut settings = Settings::new();
        settings.set("hello.prefix", "Greetings").set("hello.local_tz_offset_hours", -8);
        settings.merge(Settings::from_vars("wired", vars));

        assert_eq!(settings.len(), 3);
        assert_eq!(settings.get("hello.prefix"), Some(&json!("Howdy")));
        assert_eq!(settings.get_as::<u32>("hello.lucky_max_number").unwrap(), Some(999));
        assert_eq!(settings.get_as::<i32>("hello.local_tz_offset_hours").unwrap(), Some(-8));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, WiredError::SettingsIo { .. }));
    }

    #[test]
    fn test_item_projection() {
        let mut settings = Settings::new();
        settings.set("max_number", 10);
        let value = settings.into_value();

        assert!(value.get::<Settings>().is_some());
        let item = value.reflection().unwrap().item("max_number").unwrap();
        assert_eq!(item.as_json(), Some(&json!(10)));
    }
}
