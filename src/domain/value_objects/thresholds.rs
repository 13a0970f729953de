use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::metric_key::MetricKey;

/// Reason a single threshold entry was refused during a merge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdRejection {
    #[error("unknown metric key")]
    UnknownMetric,
    #[error("value is not a number")]
    NotNumeric,
    #[error("negative threshold {0}")]
    Negative(f64),
    #[error("percentage threshold {0} exceeds 100")]
    AbovePercentCeiling(f64),
}

/// A threshold entry dropped from an update, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedThreshold {
    pub key: String,
    pub reason: ThresholdRejection,
}

/// Outcome of [`ThresholdSet::merge`]: the new set plus every dropped entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdMerge {
    pub thresholds: ThresholdSet,
    pub rejected: Vec<RejectedThreshold>,
}

impl ThresholdMerge {
    /// Whether the merge produced a set different from `previous`.
    #[must_use]
    pub fn changed(&self, previous: &ThresholdSet) -> bool {
        &self.thresholds != previous
    }
}

/// Limits per metric key. Serialized as a flat JSON object, e.g.
/// `{"cpu_usage": 80.0, "load_average": 4.0}`.
///
/// Values are never mutated in place: updates go through [`ThresholdSet::merge`]
/// which returns a fresh set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSet(BTreeMap<MetricKey, f64>);

impl Default for ThresholdSet {
    fn default() -> Self {
        Self(BTreeMap::from([
            (MetricKey::CpuUsage, 80.0),
            (MetricKey::MemoryUsage, 85.0),
            (MetricKey::DiskUsage, 80.0),
            (MetricKey::NetworkErrorRate, 5.0),
            (MetricKey::LoadAverage, 4.0),
        ]))
    }
}

impl ThresholdSet {
    /// An empty set: no metric is evaluated.
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Configured limit for `key`. A zero limit counts as not configured.
    #[must_use]
    pub fn limit(&self, key: MetricKey) -> Option<f64> {
        self.0.get(&key).copied().filter(|limit| *limit > 0.0)
    }

    #[must_use]
    pub fn get(&self, key: MetricKey) -> Option<f64> {
        self.0.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates a partial update entry by entry and returns a new set with
    /// the valid entries applied. Invalid entries are dropped individually;
    /// the previous value of a rejected key is kept.
    #[must_use]
    pub fn merge(&self, update: &Map<String, Value>) -> ThresholdMerge {
        let mut merged = self.0.clone();
        let mut rejected = Vec::new();

        for (key, value) in update {
            match validate_entry(key, value) {
                Ok((metric, limit)) => {
                    merged.insert(metric, limit);
                }
                Err(reason) => rejected.push(RejectedThreshold {
                    key: key.clone(),
                    reason,
                }),
            }
        }

        ThresholdMerge {
            thresholds: Self(merged),
            rejected,
        }
    }

    /// Typed convenience over [`ThresholdSet::merge`].
    #[must_use]
    pub fn with(&self, key: MetricKey, limit: f64) -> ThresholdMerge {
        let mut update = Map::new();
        if let Some(number) = serde_json::Number::from_f64(limit) {
            update.insert(key.as_str().to_string(), Value::Number(number));
        } else {
            update.insert(key.as_str().to_string(), Value::Null);
        }
        self.merge(&update)
    }
}

/// Checks one `key: value` entry: known key, numeric, non-negative and at
/// most 100 unless the key is `load_average`.
///
/// # Errors
///
/// Returns the [`ThresholdRejection`] describing the first failed check.
pub fn validate_entry(key: &str, value: &Value) -> Result<(MetricKey, f64), ThresholdRejection> {
    let metric: MetricKey = key.parse().map_err(|_| ThresholdRejection::UnknownMetric)?;
    let limit = value.as_f64().ok_or(ThresholdRejection::NotNumeric)?;
    if limit < 0.0 {
        return Err(ThresholdRejection::Negative(limit));
    }
    if metric.is_percentage() && limit > 100.0 {
        return Err(ThresholdRejection::AbovePercentCeiling(limit));
    }
    Ok((metric, limit))
}
