use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::metric_key::MetricKey;

/// One cycle's worth of derived telemetry. Immutable once built; every field
/// is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub metrics: HeadlineMetrics,
    pub rates: Rates,
    pub details: Details,
}

/// Headline values, the ones thresholds are checked against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlineMetrics {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub load_average_1m: f64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
    pub process_count: u64,
    pub connection_count: u64,
    pub uptime_seconds: u64,
}

/// Rates rounded to whole numbers: bytes/s for network, ops/s for disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub network_rx_rate: f64,
    pub network_tx_rate: f64,
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub memory: MemoryDetails,
    pub disk: DiskDetails,
    pub network: NetworkDetails,
    pub disk_io: DiskIoDetails,
    pub cpu_details: CpuDetails,
    pub system_load: SystemLoad,
    pub processes: ProcessDetails,
    pub network_connections: ConnectionDetails,
    pub system: SystemDetails,
    /// `null` on hosts without a battery.
    pub battery: Option<BatteryDetails>,
    pub services: ServiceDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDetails {
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub available_gb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskDetails {
    pub usage_percent: f64,
    pub total_gb: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub mount: String,
}

impl Default for DiskDetails {
    fn default() -> Self {
        Self {
            usage_percent: 0.0,
            total_gb: 0.0,
            used_gb: 0.0,
            available_gb: 0.0,
            mount: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDetails {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
}

impl Default for NetworkDetails {
    fn default() -> Self {
        Self {
            interface: "unknown".to_string(),
            rx_bytes: 0,
            tx_bytes: 0,
            rx_errors: 0,
            tx_errors: 0,
            rx_dropped: 0,
            tx_dropped: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskIoDetails {
    pub read_ops_ps: f64,
    pub write_ops_ps: f64,
    pub read_bytes_ps: f64,
    pub write_bytes_ps: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuDetails {
    pub cores: u64,
    pub per_core_load: Vec<f64>,
    pub speed_ghz: f64,
    pub user_percent: f64,
    pub system_percent: f64,
    pub idle_percent: f64,
    pub iowait_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemLoad {
    #[serde(rename = "1min")]
    pub one: f64,
    #[serde(rename = "5min")]
    pub five: f64,
    #[serde(rename = "15min")]
    pub fifteen: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub count: u64,
    pub running: u64,
    pub sleeping: u64,
    pub top_cpu: Vec<TopProcess>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopProcess {
    pub name: String,
    pub cpu: f64,
    /// Resident memory in bytes.
    pub memory: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    pub count: u64,
    pub tcp_established: u64,
    pub tcp_listening: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDetails {
    pub platform: String,
    pub hostname: String,
    pub uptime_hours: f64,
    pub arch: String,
    pub kernel: String,
    pub distro: String,
}

impl Default for SystemDetails {
    fn default() -> Self {
        let unknown = || "unknown".to_string();
        Self {
            platform: unknown(),
            hostname: unknown(),
            uptime_hours: 0.0,
            arch: unknown(),
            kernel: unknown(),
            distro: unknown(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryDetails {
    pub percent: f64,
    pub charging: bool,
    pub time_remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub total: u64,
    pub running: u64,
    pub stopped: u64,
}

/// A single `(measurement, field, value)` sample written to the time-series
/// store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub measurement: &'static str,
    pub field: &'static str,
    pub value: f64,
}

impl SeriesPoint {
    const fn new(measurement: &'static str, field: &'static str, value: f64) -> Self {
        Self {
            measurement,
            field,
            value,
        }
    }
}

impl Snapshot {
    /// Value a threshold for `key` is checked against. `None` for keys that
    /// are stored but not evaluated.
    #[must_use]
    pub fn metric_value(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::CpuUsage => Some(self.metrics.cpu_usage),
            MetricKey::MemoryUsage => Some(self.metrics.memory_usage),
            MetricKey::DiskUsage => Some(self.metrics.disk_usage),
            MetricKey::LoadAverage => Some(self.metrics.load_average_1m),
            MetricKey::NetworkErrorRate => None,
        }
    }

    /// Flattens the snapshot into the series persisted per cycle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn series_points(&self) -> Vec<SeriesPoint> {
        let m = &self.metrics;
        let d = &self.details;
        vec![
            SeriesPoint::new("cpu", "usage_percent", m.cpu_usage),
            SeriesPoint::new("cpu", "load_average", m.load_average_1m),
            SeriesPoint::new("cpu", "user_percent", d.cpu_details.user_percent),
            SeriesPoint::new("cpu", "system_percent", d.cpu_details.system_percent),
            SeriesPoint::new("cpu", "idle_percent", d.cpu_details.idle_percent),
            SeriesPoint::new("memory", "usage_percent", m.memory_usage),
            SeriesPoint::new("memory", "total_gb", d.memory.total_gb),
            SeriesPoint::new("memory", "used_gb", d.memory.used_gb),
            SeriesPoint::new("disk", "usage_percent", m.disk_usage),
            SeriesPoint::new("disk", "total_gb", d.disk.total_gb),
            SeriesPoint::new("disk", "used_gb", d.disk.used_gb),
            SeriesPoint::new("network", "rx_bytes", d.network.rx_bytes as f64),
            SeriesPoint::new("network", "tx_bytes", d.network.tx_bytes as f64),
            SeriesPoint::new("network", "rx_rate", self.rates.network_rx_rate),
            SeriesPoint::new("network", "tx_rate", self.rates.network_tx_rate),
            SeriesPoint::new("system", "process_count", m.process_count as f64),
            SeriesPoint::new("system", "connection_count", m.connection_count as f64),
            SeriesPoint::new("system", "uptime_seconds", m.uptime_seconds as f64),
            SeriesPoint::new("disk_io", "read_ops_ps", self.rates.disk_read_rate),
            SeriesPoint::new("disk_io", "write_ops_ps", self.rates.disk_write_rate),
        ]
    }
}
