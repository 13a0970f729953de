use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key of a thresholded metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    LoadAverage,
    NetworkErrorRate,
}

impl MetricKey {
    pub const ALL: [Self; 5] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::DiskUsage,
        Self::LoadAverage,
        Self::NetworkErrorRate,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::DiskUsage => "disk_usage",
            Self::LoadAverage => "load_average",
            Self::NetworkErrorRate => "network_error_rate",
        }
    }

    /// Percentage metrics have their thresholds bounded to `[0, 100]`.
    #[must_use]
    pub const fn is_percentage(&self) -> bool {
        !matches!(self, Self::LoadAverage)
    }

    #[must_use]
    pub const fn unit(&self) -> &'static str {
        if self.is_percentage() { "%" } else { "" }
    }

    /// Upper-cased label used in alert messages, e.g. `CPU USAGE`.
    #[must_use]
    pub fn label(&self) -> String {
        self.as_str().replacen('_', " ", 1).to_uppercase()
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown metric key: {0}")]
pub struct UnknownMetricKey(pub String);

impl FromStr for MetricKey {
    type Err = UnknownMetricKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownMetricKey(s.to_string()))
    }
}
