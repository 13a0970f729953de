use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Independently sampled part of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Cpu,
    Memory,
    Filesystems,
    Network,
    DiskIo,
    Processes,
    Connections,
    Os,
    Battery,
    Services,
}

impl Subsystem {
    pub const ALL: [Self; 10] = [
        Self::Cpu,
        Self::Memory,
        Self::Filesystems,
        Self::Network,
        Self::DiskIo,
        Self::Processes,
        Self::Connections,
        Self::Os,
        Self::Battery,
        Self::Services,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Filesystems => "filesystems",
            Self::Network => "network",
            Self::DiskIo => "disk_io",
            Self::Processes => "processes",
            Self::Connections => "connections",
            Self::Os => "os",
            Self::Battery => "battery",
            Self::Services => "services",
        }
    }
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subsystem could not be read this cycle. Never fatal: the cycle goes on
/// with the subsystem's default reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{subsystem} sensor unavailable: {reason}")]
pub struct SensorUnavailable {
    pub subsystem: Subsystem,
    pub reason: String,
}

impl SensorUnavailable {
    pub fn new(subsystem: Subsystem, reason: impl Into<String>) -> Self {
        Self {
            subsystem,
            reason: reason.into(),
        }
    }
}

pub type Reading<T> = Result<T, SensorUnavailable>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuReading {
    /// Overall load in percent.
    pub load_percent: f64,
    pub per_core_load: Vec<f64>,
    pub user_percent: f64,
    pub system_percent: f64,
    pub idle_percent: f64,
    pub iowait_percent: f64,
    pub cores: usize,
    pub speed_mhz: u64,
    /// 1, 5 and 15 minute load averages.
    pub load_average: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReading {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemReading {
    pub mount: String,
    pub fs_type: String,
    pub size_bytes: u64,
    pub used_bytes: u64,
}

/// Cumulative counters of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceReading {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
}

impl InterfaceReading {
    /// Loopback interfaces are never chosen as primary when another exists.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        self.name.starts_with("lo") || self.name.to_lowercase().contains("loopback")
    }
}

/// Cumulative disk operation counters plus the per-second rates the sensor
/// derived from its own previous sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskIoReading {
    pub read_ops: u64,
    pub write_ops: u64,
    pub read_ops_per_sec: f64,
    pub write_ops_per_sec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReading {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
    /// Lower-case state name, e.g. `running` or `sleeping`.
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessListReading {
    pub total: usize,
    pub list: Vec<ProcessReading>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReading {
    /// Kernel TCP state name, e.g. `ESTABLISHED` or `LISTEN`.
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsReading {
    pub platform: String,
    pub hostname: String,
    pub arch: String,
    pub kernel: String,
    pub distro: String,
    pub uptime_seconds: u64,
}

impl Default for OsReading {
    fn default() -> Self {
        let unknown = || "unknown".to_string();
        Self {
            platform: unknown(),
            hostname: unknown(),
            arch: unknown(),
            kernel: unknown(),
            distro: unknown(),
            uptime_seconds: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryReading {
    pub percent: f64,
    pub charging: bool,
    /// Minutes left, 0 when unknown.
    pub time_remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReading {
    pub name: String,
    pub running: bool,
}

/// Everything the sensors returned for one cycle, each subsystem present or
/// absent on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReadings {
    pub cpu: Reading<CpuReading>,
    pub memory: Reading<MemoryReading>,
    pub filesystems: Reading<Vec<FilesystemReading>>,
    pub interfaces: Reading<Vec<InterfaceReading>>,
    pub disk_io: Reading<DiskIoReading>,
    pub processes: Reading<ProcessListReading>,
    pub connections: Reading<Vec<ConnectionReading>>,
    pub os: Reading<OsReading>,
    /// `Ok(None)` means the host has no battery.
    pub battery: Reading<Option<BatteryReading>>,
    pub services: Reading<Vec<ServiceReading>>,
}

impl RawReadings {
    /// Readings where every subsystem failed with the same reason.
    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        fn err<T>(subsystem: Subsystem, reason: &str) -> Reading<T> {
            Err(SensorUnavailable::new(subsystem, reason))
        }
        Self {
            cpu: err(Subsystem::Cpu, reason),
            memory: err(Subsystem::Memory, reason),
            filesystems: err(Subsystem::Filesystems, reason),
            interfaces: err(Subsystem::Network, reason),
            disk_io: err(Subsystem::DiskIo, reason),
            processes: err(Subsystem::Processes, reason),
            connections: err(Subsystem::Connections, reason),
            os: err(Subsystem::Os, reason),
            battery: err(Subsystem::Battery, reason),
            services: err(Subsystem::Services, reason),
        }
    }

    /// Subsystems that failed this cycle, in declaration order.
    #[must_use]
    pub fn unavailable_subsystems(&self) -> Vec<Subsystem> {
        let failed = [
            (Subsystem::Cpu, self.cpu.is_err()),
            (Subsystem::Memory, self.memory.is_err()),
            (Subsystem::Filesystems, self.filesystems.is_err()),
            (Subsystem::Network, self.interfaces.is_err()),
            (Subsystem::DiskIo, self.disk_io.is_err()),
            (Subsystem::Processes, self.processes.is_err()),
            (Subsystem::Connections, self.connections.is_err()),
            (Subsystem::Os, self.os.is_err()),
            (Subsystem::Battery, self.battery.is_err()),
            (Subsystem::Services, self.services.is_err()),
        ];
        failed
            .into_iter()
            .filter_map(|(subsystem, is_err)| is_err.then_some(subsystem))
            .collect()
    }

    /// Replaces every unavailable subsystem with its zero-valued default.
    /// This is the only place where missing readings get defaults.
    #[must_use]
    pub fn normalize(self) -> NormalizedReadings {
        NormalizedReadings {
            cpu: self.cpu.unwrap_or_default(),
            memory: self.memory.unwrap_or_default(),
            filesystems: self.filesystems.unwrap_or_default(),
            interfaces: self.interfaces.unwrap_or_default(),
            disk_io: self.disk_io.unwrap_or_default(),
            processes: self.processes.unwrap_or_default(),
            connections: self.connections.unwrap_or_default(),
            os: self.os.unwrap_or_default(),
            battery: self.battery.unwrap_or_default(),
            services: self.services.unwrap_or_default(),
        }
    }
}

impl From<NormalizedReadings> for RawReadings {
    fn from(readings: NormalizedReadings) -> Self {
        Self {
            cpu: Ok(readings.cpu),
            memory: Ok(readings.memory),
            filesystems: Ok(readings.filesystems),
            interfaces: Ok(readings.interfaces),
            disk_io: Ok(readings.disk_io),
            processes: Ok(readings.processes),
            connections: Ok(readings.connections),
            os: Ok(readings.os),
            battery: Ok(readings.battery),
            services: Ok(readings.services),
        }
    }
}

/// Readings with every subsystem present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedReadings {
    pub cpu: CpuReading,
    pub memory: MemoryReading,
    pub filesystems: Vec<FilesystemReading>,
    pub interfaces: Vec<InterfaceReading>,
    pub disk_io: DiskIoReading,
    pub processes: ProcessListReading,
    pub connections: Vec<ConnectionReading>,
    pub os: OsReading,
    pub battery: Option<BatteryReading>,
    pub services: Vec<ServiceReading>,
}
