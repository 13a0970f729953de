use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::snapshot::Snapshot;
use crate::domain::value_objects::history::{HistoricalMetric, HistoricalPoint, TimeRange};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    ReadFailed(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TimeSeriesSink: Send + Sync {
    /// Persist every series point of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write operation fails.
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

#[async_trait]
pub trait HistoricalQuery: Send + Sync {
    /// Points for `metric` within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read operation fails.
    async fn query(
        &self,
        metric: HistoricalMetric,
        range: TimeRange,
    ) -> Result<Vec<HistoricalPoint>, StoreError>;
}
