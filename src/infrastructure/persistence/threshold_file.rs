use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::domain::ports::config_store::{ConfigStore, ConfigStoreError};
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Thresholds persisted as a pretty-printed JSON object.
///
/// Loaded entries go through the same validation as live updates: an
/// invalid entry keeps its default value.
pub struct JsonThresholdStore {
    path: PathBuf,
}

impl JsonThresholdStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonThresholdStore {
    fn load(&self) -> Result<ThresholdSet, ConfigStoreError> {
        if !self.path.exists() {
            return Err(ConfigStoreError::NotFound);
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigStoreError::Io(format!("{}: {e}", self.path.display())))?;
        let entries: Map<String, Value> = serde_json::from_str(&content)
            .map_err(|e| ConfigStoreError::Parse(format!("{}: {e}", self.path.display())))?;

        let merged = ThresholdSet::default().merge(&entries);
        for entry in &merged.rejected {
            tracing::warn!(
                "Ignoring persisted threshold '{}' in {}: {}",
                entry.key,
                self.path.display(),
                entry.reason
            );
        }
        Ok(merged.thresholds)
    }

    fn save(&self, thresholds: &ThresholdSet) -> Result<(), ConfigStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigStoreError::Io(format!("{}: {e}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(thresholds)
            .map_err(|e| ConfigStoreError::Parse(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| ConfigStoreError::Io(format!("{}: {e}", self.path.display())))?;
        tracing::debug!("Thresholds saved to {}", self.path.display());
        Ok(())
    }
}
