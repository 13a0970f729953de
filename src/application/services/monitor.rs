use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};

use super::gateway::{SensorGateway, panic_message};
use super::publisher::Publisher;
use super::thresholds::{ThresholdRegistry, ThresholdUpdate};
use crate::domain::entities::alert::Alert;
use crate::domain::entities::event::MonitorEvent;
use crate::domain::entities::reading::Subsystem;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::config_store::ConfigStore;
use crate::domain::ports::notifier::AlertSink;
use crate::domain::ports::sensor::SensorSource;
use crate::domain::ports::store::{HistoricalQuery, TimeSeriesSink};
use crate::domain::services::rate_tracker::RateTracker;
use crate::domain::services::snapshot_builder;
use crate::domain::services::threshold_evaluator::{AlertSuppressionState, evaluate};
use crate::domain::value_objects::history::{HistoricalMetric, HistoricalPoint, TimeRange};
use crate::domain::value_objects::thresholds::ThresholdSet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("collection cycle panicked: {0}")]
    Panicked(String),
}

/// Everything the engine talks to. Only the sensors and the threshold
/// store are mandatory.
pub struct Collaborators {
    pub sensors: Arc<dyn SensorSource>,
    pub config_store: Arc<dyn ConfigStore>,
    pub time_series: Option<Arc<dyn TimeSeriesSink>>,
    pub history: Option<Arc<dyn HistoricalQuery>>,
    pub alerts: Option<Arc<dyn AlertSink>>,
}

/// Result of a single collection cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: Arc<Snapshot>,
    pub alerts: Vec<Alert>,
    pub unavailable: Vec<Subsystem>,
}

/// State only a running cycle may touch.
#[derive(Debug, Default)]
struct CycleState {
    rates: RateTracker,
    suppression: AlertSuppressionState,
}

/// Owns the engine: sample → normalize → rates → snapshot → evaluate →
/// publish. Cycles are serialized; the current snapshot is readable at any
/// time.
pub struct MonitorContext {
    gateway: SensorGateway,
    thresholds: ThresholdRegistry,
    publisher: Publisher,
    history: Option<Arc<dyn HistoricalQuery>>,
    cycle_state: Mutex<CycleState>,
    current: RwLock<Arc<Snapshot>>,
    last_cycle: RwLock<Option<DateTime<Utc>>>,
    #[cfg(test)]
    fail_next_cycle: std::sync::atomic::AtomicBool,
}

impl MonitorContext {
    /// Builds the context and loads the persisted thresholds.
    #[must_use]
    pub fn new(collaborators: Collaborators, max_in_flight: usize) -> Self {
        let Collaborators {
            sensors,
            config_store,
            time_series,
            history,
            alerts,
        } = collaborators;
        Self {
            gateway: SensorGateway::new(sensors),
            thresholds: ThresholdRegistry::load(config_store),
            publisher: Publisher::new(time_series, alerts, max_in_flight),
            history,
            cycle_state: Mutex::new(CycleState::default()),
            current: RwLock::new(Arc::new(snapshot_builder::placeholder(Utc::now()))),
            last_cycle: RwLock::new(None),
            #[cfg(test)]
            fail_next_cycle: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Makes the next cycle panic after sampling.
    #[cfg(test)]
    pub(crate) fn fail_next_cycle(&self) {
        self.fail_next_cycle
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Runs one cycle stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns `CycleError::Panicked` if any stage of the cycle panicked.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one cycle stamped `now`. A panic anywhere in the cycle is caught,
    /// logged and published as a `CycleFailure` event.
    ///
    /// # Errors
    ///
    /// Returns `CycleError::Panicked` if any stage of the cycle panicked.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let mut state = self.cycle_state.lock().await;
        match AssertUnwindSafe(self.cycle(&mut state, now))
            .catch_unwind()
            .await
        {
            Ok(report) => Ok(report),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Collection cycle failed: {message}");
                self.publisher.publish_failure(now, message.clone());
                Err(CycleError::Panicked(message))
            }
        }
    }

    async fn cycle(&self, state: &mut CycleState, now: DateTime<Utc>) -> CycleReport {
        let raw = self.gateway.sample().await;
        #[cfg(test)]
        assert!(
            !self
                .fail_next_cycle
                .swap(false, std::sync::atomic::Ordering::SeqCst),
            "injected cycle failure"
        );
        let unavailable = raw.unavailable_subsystems();
        let readings = raw.normalize();

        let rates = state.rates.observe_cycle(&readings, now);
        let snapshot = Arc::new(snapshot_builder::build(&readings, &rates, now));

        let thresholds = self.thresholds.current();
        let alerts = evaluate(&snapshot, &thresholds, &mut state.suppression, now);

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        *self.last_cycle.write().unwrap_or_else(PoisonError::into_inner) = Some(now);

        self.publisher
            .publish_cycle(Arc::clone(&snapshot), alerts.clone());

        let m = &snapshot.metrics;
        tracing::info!(
            "CPU {}% | Mem {}% | Disk {}% | Clients {}",
            m.cpu_usage,
            m.memory_usage,
            m.disk_usage,
            self.publisher.subscriber_count()
        );

        CycleReport {
            snapshot,
            alerts,
            unavailable,
        }
    }

    /// Latest snapshot, or the all-defaults placeholder before the first
    /// cycle.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn last_cycle_time(&self) -> Option<DateTime<Utc>> {
        *self.last_cycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn thresholds(&self) -> ThresholdSet {
        self.thresholds.current()
    }

    /// Validates and applies a partial threshold update; subscribers are
    /// told when the set actually changed, in the order updates applied.
    pub fn update_thresholds(&self, update: &Map<String, Value>) -> ThresholdUpdate {
        self.thresholds.update_with(update, |thresholds| {
            self.publisher.publish_thresholds(thresholds.clone());
        })
    }

    /// Stored points for `metric` over `range` (e.g. `1h`, `7d`; empty means
    /// one hour). Any failure yields an empty list.
    pub async fn historical_data(&self, metric: &str, range: &str) -> Vec<HistoricalPoint> {
        let metric: HistoricalMetric = match metric.parse() {
            Ok(metric) => metric,
            Err(e) => {
                tracing::warn!("{e}");
                return Vec::new();
            }
        };
        let range = if range.trim().is_empty() {
            TimeRange::default()
        } else {
            match range.parse::<TimeRange>() {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("{e}");
                    return Vec::new();
                }
            }
        };
        let Some(history) = &self.history else {
            tracing::debug!("No historical backend configured");
            return Vec::new();
        };
        match history.query(metric, range).await {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!("Historical query for {metric} failed: {e}");
                Vec::new()
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.publisher.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.publisher.subscriber_count()
    }

    /// Waits for in-flight side effects; see [`Publisher::drain`].
    pub async fn drain(&self, timeout: Duration) -> usize {
        self.publisher.drain(timeout).await
    }
}
