//! Hub discovery module
//!
//! Scans the definitions directory for hub folders and loads their `hub.yaml`

use crate::error::StageError;
use crate::registry::{HubEntry, HubRegistry};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use trackhub_libs::load_hub_config;
use walkdir::WalkDir;

/// File name of a hub definition inside its folder
pub const DEFINITION_FILE: &str = "hub.yaml";

/// Service responsible for discovering hub definitions in the filesystem
pub struct DiscoveryService {
    /// Root directory to scan for hub folders
    definitions_dir: PathBuf,
}

impl DiscoveryService {
    /// Create a new discovery service
    ///
    /// # Arguments
    ///
    /// * `definitions_dir` - Path to the directory containing one folder per hub
    pub fn new<P: AsRef<Path>>(definitions_dir: P) -> Self {
        Self {
            definitions_dir: definitions_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover all hubs in the definitions directory
    ///
    /// Definitions that fail to load or repeat a hub name are logged and
    /// skipped; they never stop the scan.
    ///
    /// # Returns
    ///
    /// * `Ok(HubRegistry)` - Registry with all discovered hubs
    /// * `Err(StageError)` - Failed to create a missing definitions directory
    pub fn discover_hubs(&self) -> Result<HubRegistry, StageError> {
        let mut registry = HubRegistry::new();

        if !self.definitions_dir.exists() {
            warn!(
                "Definitions directory {:?} does not exist, creating it",
                self.definitions_dir
            );
            std::fs::create_dir_all(&self.definitions_dir)?;
            return Ok(registry);
        }

        for definition_path in self.scan_definition_paths() {
            match load_hub_config(&definition_path) {
                Ok(config) => {
                    let name = config.hub.name.clone();
                    let entry = HubEntry {
                        name: name.clone(),
                        path: definition_path.clone(),
                        config,
                    };

                    match registry.register(entry) {
                        Ok(()) => info!("Registered hub '{}' from {:?}", name, definition_path),
                        Err(e) => error!("Failed to register hub '{}': {}", name, e),
                    }
                }
                Err(e) => {
                    error!("Failed to load hub definition at {:?}: {}", definition_path, e);
                }
            }
        }

        Ok(registry)
    }

    /// Paths of every `hub.yaml` one level below the definitions directory, sorted
    pub fn scan_definition_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(&self.definitions_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_dir() {
                continue;
            }

            let definition_path = entry.path().join(DEFINITION_FILE);
            if definition_path.exists() {
                paths.push(definition_path);
            } else {
                warn!("Skipping {:?} - no {} found", entry.file_name(), DEFINITION_FILE);
            }
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_hub(root: &Path, folder: &str, name: &str) {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        let yaml = format!(
            "hub:\n  name: {}\n  email: lab@example.org\ngenomes:\n  - name: hg38\n    tracks:\n      - name: t\n        type: bigWig\n        url: https://example.org/t.bw\n",
            name
        );
        fs::write(dir.join(DEFINITION_FILE), yaml).unwrap();
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let service = DiscoveryService::new(temp_dir.path());

        let registry = service.discover_hubs().unwrap();
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_missing_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("hubs");
        let service = DiscoveryService::new(&missing);

        assert_eq!(service.discover_hubs().unwrap().count(), 0);
        assert!(missing.is_dir());
    }

    #[test]
    fn test_discover_skips_broken_and_duplicate_definitions() {
        let temp_dir = TempDir::new().unwrap();
        write_hub(temp_dir.path(), "a_lab", "labHub");
        write_hub(temp_dir.path(), "b_copy", "labHub");
        write_hub(temp_dir.path(), "c_other", "otherHub");
        fs::create_dir_all(temp_dir.path().join("d_broken")).unwrap();
        fs::write(temp_dir.path().join("d_broken").join(DEFINITION_FILE), "hub: [").unwrap();
        fs::create_dir_all(temp_dir.path().join("e_empty")).unwrap();

        let service = DiscoveryService::new(temp_dir.path());
        assert_eq!(service.scan_definition_paths().len(), 4);

        let registry = service.discover_hubs().unwrap();
        assert_eq!(registry.count(), 2);
        assert!(registry.get("labHub").unwrap().path.starts_with(temp_dir.path().join("a_lab")));
        assert!(registry.get("otherHub").is_some());
    }
}
