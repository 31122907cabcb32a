//! Hub registry module
//!
//! Keeps every discovered hub definition, keyed by hub name

use crate::error::StageError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use trackhub_libs::HubConfig;

/// A discovered hub definition
#[derive(Debug, Clone, Serialize)]
pub struct HubEntry {
    /// Hub name from the definition
    pub name: String,

    /// Path of the `hub.yaml` file
    pub path: PathBuf,

    /// Parsed definition
    pub config: HubConfig,
}

/// Registry of all discovered hubs
#[derive(Debug, Clone, Default)]
pub struct HubRegistry {
    /// Map of hub name to entry, ordered for stable publishing
    hubs: BTreeMap<String, HubEntry>,
}

impl HubRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hub
    ///
    /// # Arguments
    ///
    /// * `entry` - Hub definition to register
    ///
    /// # Returns
    ///
    /// * `Ok(())` if registered successfully
    /// * `Err(StageError::Registry)` if a hub with the same name exists
    pub fn register(&mut self, entry: HubEntry) -> Result<(), StageError> {
        if let Some(existing) = self.hubs.get(&entry.name) {
            return Err(StageError::Registry(format!(
                "Hub '{}' from {:?} is already registered from {:?}",
                entry.name, entry.path, existing.path
            )));
        }

        self.hubs.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Get a hub by name
    pub fn get(&self, name: &str) -> Option<&HubEntry> {
        self.hubs.get(name)
    }

    /// All registered hubs, ordered by name
    pub fn hubs(&self) -> impl Iterator<Item = &HubEntry> {
        self.hubs.values()
    }

    /// Count of registered hubs
    pub fn count(&self) -> usize {
        self.hubs.len()
    }
}
