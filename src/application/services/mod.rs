pub mod gateway;
pub mod monitor;
pub mod publisher;
pub mod scheduler;
pub mod thresholds;

pub use monitor::{Collaborators, CycleError, CycleReport, MonitorContext};
pub use scheduler::{CollectionScheduler, RunStatus};
