use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Alert;
use super::snapshot::Snapshot;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Event pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A completed cycle and the alerts it raised.
    Snapshot {
        snapshot: Arc<Snapshot>,
        alerts: Vec<Alert>,
    },
    ThresholdsChanged { thresholds: ThresholdSet },
    CycleFailure {
        timestamp: DateTime<Utc>,
        error: String,
    },
}

impl MonitorEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::ThresholdsChanged { .. } => "thresholds_changed",
            Self::CycleFailure { .. } => "cycle_failure",
        }
    }
}
