use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;

use crate::domain::entities::reading::{RawReadings, SensorUnavailable, Subsystem};
use crate::domain::ports::sensor::{SensorSource, SubsystemData};

/// Samples every subsystem concurrently and isolates their failures.
pub struct SensorGateway {
    source: Arc<dyn SensorSource>,
}

impl SensorGateway {
    #[must_use]
    pub fn new(source: Arc<dyn SensorSource>) -> Self {
        Self { source }
    }

    /// Fetches all subsystems at once and waits for every one of them. A
    /// subsystem that errors or panics is reported unavailable; the others
    /// are unaffected. No retries.
    pub async fn sample(&self) -> RawReadings {
        let results = join_all(Subsystem::ALL.map(|subsystem| self.fetch_guarded(subsystem))).await;

        let mut readings = RawReadings::unavailable("not sampled");
        for result in results {
            match result {
                Ok(data) => assign(&mut readings, data),
                Err(e) => mark_unavailable(&mut readings, e),
            }
        }

        let unavailable = readings.unavailable_subsystems();
        if !unavailable.is_empty() {
            let names: Vec<&str> = unavailable.iter().map(Subsystem::as_str).collect();
            tracing::debug!("Unavailable sensors this cycle: {}", names.join(", "));
        }
        readings
    }

    async fn fetch_guarded(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
        match AssertUnwindSafe(self.source.fetch(subsystem))
            .catch_unwind()
            .await
        {
            Ok(Ok(data)) if data.subsystem() == subsystem => Ok(data),
            Ok(Ok(data)) => Err(SensorUnavailable::new(
                subsystem,
                format!("sensor returned {} data", data.subsystem()),
            )),
            Ok(Err(e)) => Err(SensorUnavailable::new(subsystem, e.reason)),
            Err(panic) => Err(SensorUnavailable::new(
                subsystem,
                format!("sensor panicked: {}", panic_message(panic.as_ref())),
            )),
        }
    }
}

fn assign(readings: &mut RawReadings, data: SubsystemData) {
    match data {
        SubsystemData::Cpu(r) => readings.cpu = Ok(r),
        SubsystemData::Memory(r) => readings.memory = Ok(r),
        SubsystemData::Filesystems(r) => readings.filesystems = Ok(r),
        SubsystemData::Network(r) => readings.interfaces = Ok(r),
        SubsystemData::DiskIo(r) => readings.disk_io = Ok(r),
        SubsystemData::Processes(r) => readings.processes = Ok(r),
        SubsystemData::Connections(r) => readings.connections = Ok(r),
        SubsystemData::Os(r) => readings.os = Ok(r),
        SubsystemData::Battery(r) => readings.battery = Ok(r),
        SubsystemData::Services(r) => readings.services = Ok(r),
    }
}

fn mark_unavailable(readings: &mut RawReadings, err: SensorUnavailable) {
    match err.subsystem {
        Subsystem::Cpu => readings.cpu = Err(err),
        Subsystem::Memory => readings.memory = Err(err),
        Subsystem::Filesystems => readings.filesystems = Err(err),
        Subsystem::Network => readings.interfaces = Err(err),
        Subsystem::DiskIo => readings.disk_io = Err(err),
        Subsystem::Processes => readings.processes = Err(err),
        Subsystem::Connections => readings.connections = Err(err),
        Subsystem::Os => readings.os = Err(err),
        Subsystem::Battery => readings.battery = Err(err),
        Subsystem::Services => readings.services = Err(err),
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
