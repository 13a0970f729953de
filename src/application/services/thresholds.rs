use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{Map, Value};

use crate::domain::ports::config_store::{ConfigStore, ConfigStoreError};
use crate::domain::value_objects::thresholds::{ThresholdMerge, ThresholdSet};

/// Owns the live threshold set and its persistence.
///
/// Reads hand out clones; updates run validate, merge and persist under a
/// single lock so concurrent updates never interleave.
pub struct ThresholdRegistry {
    current: Mutex<ThresholdSet>,
    store: Arc<dyn ConfigStore>,
}

impl ThresholdRegistry {
    /// Loads the persisted set, falling back to defaults when nothing was
    /// persisted or the store cannot be read.
    #[must_use]
    pub fn load(store: Arc<dyn ConfigStore>) -> Self {
        let initial = match store.load() {
            Ok(thresholds) => thresholds,
            Err(ConfigStoreError::NotFound) => {
                tracing::debug!("No persisted thresholds, using defaults");
                ThresholdSet::default()
            }
            Err(e) => {
                tracing::warn!("Failed to load thresholds, using defaults: {e}");
                ThresholdSet::default()
            }
        };
        Self {
            current: Mutex::new(initial),
            store,
        }
    }

    #[must_use]
    pub fn current(&self) -> ThresholdSet {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies a partial update. Invalid entries are logged and dropped.
    /// A changed set is persisted; a failed save is logged and the new set
    /// still takes effect.
    pub fn update(&self, update: &Map<String, Value>) -> ThresholdUpdate {
        self.update_with(update, |_| {})
    }

    /// Like [`update`](Self::update), calling `on_change` with the new set
    /// before the lock is released, so observers see changes in the order
    /// they were applied.
    pub fn update_with(
        &self,
        update: &Map<String, Value>,
        on_change: impl FnOnce(&ThresholdSet),
    ) -> ThresholdUpdate {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let ThresholdMerge {
            thresholds,
            rejected,
        } = current.merge(update);

        for entry in &rejected {
            tracing::warn!("Rejected threshold '{}': {}", entry.key, entry.reason);
        }

        let changed = thresholds != *current;
        if changed {
            if let Err(e) = self.store.save(&thresholds) {
                tracing::warn!("Failed to save thresholds: {e}");
            }
            *current = thresholds.clone();
            tracing::info!("Thresholds updated: {}", describe(&thresholds));
            on_change(&thresholds);
        }
        drop(current);

        ThresholdUpdate {
            thresholds,
            rejected: rejected.into_iter().map(|r| r.key).collect(),
            changed,
        }
    }
}

/// Outcome of [`ThresholdRegistry::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdUpdate {
    /// The set in effect after the update.
    pub thresholds: ThresholdSet,
    /// Keys that were dropped.
    pub rejected: Vec<String>,
    pub changed: bool,
}

fn describe(thresholds: &ThresholdSet) -> String {
    thresholds
        .iter()
        .map(|(key, limit)| format!("{key}={limit}"))
        .collect::<Vec<_>>()
        .join(", ")
}
