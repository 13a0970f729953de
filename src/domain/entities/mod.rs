pub mod alert;
pub mod event;
pub mod reading;
pub mod snapshot;

pub use alert::Alert;
pub use event::MonitorEvent;
pub use reading::{NormalizedReadings, RawReadings, Reading, SensorUnavailable, Subsystem};
pub use snapshot::{SeriesPoint, Snapshot};
