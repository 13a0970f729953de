//! Host telemetry collection engine: samples sensors, derives normalized
//! metrics and rates, evaluates thresholds and fans results out.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
