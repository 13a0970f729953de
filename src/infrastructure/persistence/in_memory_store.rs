use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::config_store::{ConfigStore, ConfigStoreError};
use crate::domain::ports::store::{HistoricalQuery, StoreError, TimeSeriesSink};
use crate::domain::value_objects::history::{HistoricalMetric, HistoricalPoint, TimeRange};
use crate::domain::value_objects::thresholds::ThresholdSet;

#[derive(Debug, Clone)]
struct Sample {
    recorded_at: DateTime<Utc>,
    measurement: &'static str,
    field: &'static str,
    value: f64,
}

/// In-memory store for tests and runs without a database.
pub struct InMemoryStore {
    samples: Mutex<Vec<Sample>>,
    thresholds: Mutex<Option<ThresholdSet>>,
}

impl InMemoryStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            thresholds: Mutex::new(None),
        }
    }

    /// Number of stored series points.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.lock().map_or(0, |samples| samples.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TimeSeriesSink for InMemoryStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let points = snapshot.series_points().into_iter().map(|p| Sample {
            recorded_at: snapshot.timestamp,
            measurement: p.measurement,
            field: p.field,
            value: p.value,
        });
        self.samples
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?
            .extend(points);
        Ok(())
    }
}

#[async_trait]
impl HistoricalQuery for InMemoryStore {
    async fn query(
        &self,
        metric: HistoricalMetric,
        range: TimeRange,
    ) -> Result<Vec<HistoricalPoint>, StoreError> {
        let since = range.start_from(Utc::now());
        let samples = self
            .samples
            .lock()
            .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

        let mut points: Vec<HistoricalPoint> = samples
            .iter()
            .filter(|s| {
                s.measurement == metric.measurement()
                    && metric.fields().contains(&s.field)
                    && s.recorded_at >= since
            })
            .map(|s| HistoricalPoint {
                timestamp: s.recorded_at,
                field: metric.is_multi_field().then(|| s.field.to_string()),
                value: s.value,
            })
            .collect();
        drop(samples);

        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

impl ConfigStore for InMemoryStore {
    fn load(&self) -> Result<ThresholdSet, ConfigStoreError> {
        self.thresholds
            .lock()
            .map_err(|_| ConfigStoreError::Io("lock poisoned".into()))?
            .clone()
            .ok_or(ConfigStoreError::NotFound)
    }

    fn save(&self, thresholds: &ThresholdSet) -> Result<(), ConfigStoreError> {
        *self
            .thresholds
            .lock()
            .map_err(|_| ConfigStoreError::Io("lock poisoned".into()))? = Some(thresholds.clone());
        Ok(())
    }
}
