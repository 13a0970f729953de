pub mod history;
pub mod metric_key;
pub mod severity;
pub mod thresholds;

pub use history::{HistoricalMetric, HistoricalPoint, HistoryParseError, TimeRange};
pub use metric_key::{MetricKey, UnknownMetricKey};
pub use severity::Severity;
pub use thresholds::{RejectedThreshold, ThresholdMerge, ThresholdRejection, ThresholdSet};
