pub mod daemon;
pub mod history;
pub mod snapshot;
pub mod thresholds;
