use thiserror::Error;

use crate::domain::value_objects::thresholds::ThresholdSet;

#[derive(Error, Debug)]
pub enum ConfigStoreError {
    #[error("no persisted thresholds")]
    NotFound,
    #[error("threshold store I/O failed: {0}")]
    Io(String),
    #[error("persisted thresholds are malformed: {0}")]
    Parse(String),
}

/// Durable home of the threshold set.
pub trait ConfigStore: Send + Sync {
    /// Load the persisted thresholds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigStoreError::NotFound` when nothing was persisted yet,
    /// or another variant when reading or parsing fails.
    fn load(&self) -> Result<ThresholdSet, ConfigStoreError>;

    /// Persist the thresholds, replacing what was stored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigStoreError` if the write operation fails.
    fn save(&self, thresholds: &ThresholdSet) -> Result<(), ConfigStoreError>;
}
