use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::metric_key::MetricKey;
use crate::domain::value_objects::severity::Severity;

/// A threshold breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: MetricKey,
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Builds the alert for `metric`, classifying severity and formatting
    /// the message, e.g. `CPU USAGE is 85.00% (threshold: 80%)`.
    #[must_use]
    pub fn breach(metric: MetricKey, value: f64, threshold: f64, timestamp: DateTime<Utc>) -> Self {
        let unit = metric.unit();
        Self {
            metric,
            value,
            threshold,
            unit: unit.to_string(),
            severity: Severity::classify(value, threshold),
            message: format!(
                "{} is {value:.2}{unit} (threshold: {threshold}{unit})",
                metric.label()
            ),
            timestamp,
        }
    }
}
