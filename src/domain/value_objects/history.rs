use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metric that can be queried from the time-series store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoricalMetric {
    CpuUsage,
    MemoryUsage,
    DiskUsage,
    SystemLoad,
    DiskIo,
}

impl HistoricalMetric {
    pub const ALL: [Self; 5] = [
        Self::CpuUsage,
        Self::MemoryUsage,
        Self::DiskUsage,
        Self::SystemLoad,
        Self::DiskIo,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CpuUsage => "cpu_usage",
            Self::MemoryUsage => "memory_usage",
            Self::DiskUsage => "disk_usage",
            Self::SystemLoad => "system_load",
            Self::DiskIo => "disk_io",
        }
    }

    /// Measurement the metric is stored under.
    #[must_use]
    pub const fn measurement(&self) -> &'static str {
        match self {
            Self::CpuUsage | Self::SystemLoad => "cpu",
            Self::MemoryUsage => "memory",
            Self::DiskUsage => "disk",
            Self::DiskIo => "disk_io",
        }
    }

    /// Fields read for the metric.
    #[must_use]
    pub const fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::CpuUsage | Self::MemoryUsage | Self::DiskUsage => &["usage_percent"],
            Self::SystemLoad => &["load_average"],
            Self::DiskIo => &["read_ops_ps", "write_ops_ps"],
        }
    }

    /// Multi-field metrics tag each point with its field name.
    #[must_use]
    pub const fn is_multi_field(&self) -> bool {
        self.fields().len() > 1
    }
}

impl std::fmt::Display for HistoricalMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryParseError {
    #[error("unknown historical metric: {0}")]
    UnknownMetric(String),
    #[error("invalid time range '{0}': expected <n>s, <n>m, <n>h, <n>d or <n>w")]
    InvalidRange(String),
}

impl FromStr for HistoricalMetric {
    type Err = HistoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| HistoryParseError::UnknownMetric(s.to_string()))
    }
}

/// Look-back window of a historical query, e.g. `1h` or `7d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    seconds: i64,
}

impl TimeRange {
    pub const DEFAULT: &'static str = "1h";
    /// Longest accepted window: 100 years.
    pub const MAX_SECONDS: i64 = 100 * 366 * 86_400;

    #[must_use]
    pub const fn from_seconds(seconds: i64) -> Self {
        Self { seconds }
    }

    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::try_seconds(self.seconds).unwrap_or(Duration::MAX)
    }

    /// Oldest timestamp inside the window ending at `now`.
    #[must_use]
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_seconds(self.seconds)
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::from_seconds(3600)
    }
}

impl FromStr for TimeRange {
    type Err = HistoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HistoryParseError::InvalidRange(s.to_string());
        let trimmed = s.trim();
        let unit = trimmed.chars().last().ok_or_else(invalid)?;
        let multiplier = match unit {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            'w' => 604_800,
            _ => return Err(invalid()),
        };
        let amount: i64 = trimmed[..trimmed.len() - 1]
            .parse()
            .map_err(|_| invalid())?;
        if amount <= 0 {
            return Err(invalid());
        }
        amount
            .checked_mul(multiplier)
            .filter(|seconds| *seconds <= Self::MAX_SECONDS)
            .map(Self::from_seconds)
            .ok_or_else(invalid)
    }
}

/// One stored sample returned by a historical query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub value: f64,
}
