use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;

type BackendFactory = Box<dyn FnOnce() -> Result<Box<dyn DetectorBackend>>>;

/// Registry of named detector backends.
///
/// Backends are registered as constructors so that expensive setup (model
/// loading) only happens for the backend that is actually selected.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend constructor, replacing any earlier one with the same name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: FnOnce() -> Result<Box<dyn DetectorBackend>> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct the named backend and warm it up, consuming its registration.
    pub fn build(&mut self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let factory = self.factories.remove(name).ok_or_else(|| {
            anyhow!(
                "detector backend '{}' not available (registered: {})",
                name,
                self.list().join(", ")
            )
        })?;
        let mut backend = factory()?;
        backend.warm_up()?;
        log::info!("detector backend '{}' ready", backend.name());
        Ok(backend)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
