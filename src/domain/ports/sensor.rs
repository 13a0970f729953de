use async_trait::async_trait;

use crate::domain::entities::reading::{
    BatteryReading, ConnectionReading, CpuReading, DiskIoReading, FilesystemReading,
    InterfaceReading, MemoryReading, OsReading, ProcessListReading, SensorUnavailable,
    ServiceReading, Subsystem,
};

/// Payload of a single subsystem fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SubsystemData {
    Cpu(CpuReading),
    Memory(MemoryReading),
    Filesystems(Vec<FilesystemReading>),
    Network(Vec<InterfaceReading>),
    DiskIo(DiskIoReading),
    Processes(ProcessListReading),
    Connections(Vec<ConnectionReading>),
    Os(OsReading),
    Battery(Option<BatteryReading>),
    Services(Vec<ServiceReading>),
}

impl SubsystemData {
    #[must_use]
    pub const fn subsystem(&self) -> Subsystem {
        match self {
            Self::Cpu(_) => Subsystem::Cpu,
            Self::Memory(_) => Subsystem::Memory,
            Self::Filesystems(_) => Subsystem::Filesystems,
            Self::Network(_) => Subsystem::Network,
            Self::DiskIo(_) => Subsystem::DiskIo,
            Self::Processes(_) => Subsystem::Processes,
            Self::Connections(_) => Subsystem::Connections,
            Self::Os(_) => Subsystem::Os,
            Self::Battery(_) => Subsystem::Battery,
            Self::Services(_) => Subsystem::Services,
        }
    }
}

/// Source of raw host readings, one subsystem at a time.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Read one subsystem.
    ///
    /// # Errors
    ///
    /// Returns `SensorUnavailable` when the subsystem cannot be read on this
    /// host or this cycle.
    async fn fetch(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable>;
}
