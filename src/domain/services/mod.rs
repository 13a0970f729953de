//! Pure derivation logic: no I/O, no clocks. Every function takes `now`
//! explicitly.

pub mod rate_tracker;
pub mod snapshot_builder;
pub mod threshold_evaluator;

pub use rate_tracker::{CounterPair, CycleRates, RateKey, RatePair, RateTracker};
pub use threshold_evaluator::{AlertSuppressionState, evaluate};
