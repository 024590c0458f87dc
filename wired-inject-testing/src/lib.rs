//! Test support for code built on wired-inject.
//!
//! [`RecordingContainer`] is a hand-filled [`Container`] that remembers every
//! lookup made against it, and [`init_tracing`] installs a subscriber once per
//! test binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::EnvFilter;
use wired_inject::{Capability, Container, Result, Value, WiredError};

/// One call to [`Container::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub capability: Capability,
    pub name: String,
    pub with_context: bool,
}

/// In-memory container keyed by capability and name.
///
/// Context is recorded but ignored for matching.
#[derive(Default)]
pub struct RecordingContainer {
    values: HashMap<(Capability, String), Value>,
    lookups: Mutex<Vec<Lookup>>,
}

impl RecordingContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: ?Sized + Send + Sync + 'static>(self, instance: Arc<T>) -> Self {
        self.with_named("", instance)
    }

    pub fn with_named<T: ?Sized + Send + Sync + 'static>(
        self,
        name: &str,
        instance: Arc<T>,
    ) -> Self {
        self.with_value(Capability::of::<T>(), name, Value::from_arc(instance))
    }

    pub fn with_value(mut self, capability: Capability, name: &str, value: Value) -> Self {
        self.values.insert((capability, name.to_string()), value);
        self
    }

    /// Lookups made so far, oldest first.
    pub fn lookups(&self) -> Vec<Lookup> {
        self.lookups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Container for RecordingContainer {
    fn get(&self, capability: &Capability, name: &str, context: Option<&Value>) -> Result<Value> {
        self.lookups
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Lookup {
                capability: *capability,
                name: name.to_string(),
                with_context: context.is_some(),
            });
        self.values
            .get(&(*capability, name.to_string()))
            .cloned()
            .ok_or_else(|| WiredError::Resolution {
                capability: capability.to_string(),
                name: name.to_string(),
            })
    }
}

static TRACING: Once = Once::new();

/// Install a test-writer subscriber honouring `RUST_LOG`; later calls do nothing.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}
