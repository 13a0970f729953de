use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::entities::alert::Alert;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::metric_key::MetricKey;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Minimum quiet period between two alerts for the same metric.
pub const SUPPRESSION_WINDOW_SECS: i64 = 300;

/// Metrics checked each cycle, in alert order.
const EVALUATED: [MetricKey; 4] = [
    MetricKey::CpuUsage,
    MetricKey::MemoryUsage,
    MetricKey::DiskUsage,
    MetricKey::LoadAverage,
];

/// Last alert time per metric. Bounded by the fixed key set.
#[derive(Debug, Default, Clone)]
pub struct AlertSuppressionState {
    last_alert: HashMap<MetricKey, DateTime<Utc>>,
}

impl AlertSuppressionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn last_alert(&self, key: MetricKey) -> Option<DateTime<Utc>> {
        self.last_alert.get(&key).copied()
    }

    fn is_suppressed(&self, key: MetricKey, now: DateTime<Utc>) -> bool {
        self.last_alert
            .get(&key)
            .is_some_and(|last| (now - *last).num_milliseconds() <= SUPPRESSION_WINDOW_SECS * 1000)
    }
}

/// Checks the snapshot's headline metrics against `thresholds`.
///
/// A metric alerts when its value is strictly above a configured, non-zero
/// limit and no alert for it was raised in the last five minutes. Emitting
/// records `now` in `suppression`. Returning below the limit is silent.
pub fn evaluate(
    snapshot: &Snapshot,
    thresholds: &ThresholdSet,
    suppression: &mut AlertSuppressionState,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for key in EVALUATED {
        let Some(threshold) = thresholds.limit(key) else {
            continue;
        };
        let Some(value) = snapshot.metric_value(key).filter(|v| v.is_finite()) else {
            continue;
        };
        if value <= threshold || suppression.is_suppressed(key, now) {
            continue;
        }
        alerts.push(Alert::breach(key, value, threshold, now));
        suppression.last_alert.insert(key, now);
    }

    alerts
}
