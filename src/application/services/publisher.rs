use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::domain::entities::alert::Alert;
use crate::domain::entities::event::MonitorEvent;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::notifier::AlertSink;
use crate::domain::ports::store::TimeSeriesSink;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Events buffered per subscriber before a slow one starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fans a cycle's results out: live subscribers first, then the store
/// write and alert delivery as background tasks.
///
/// Side effects run in a bounded task set. When it is full the new side
/// effect is dropped with a warning; nothing is queued.
pub struct Publisher {
    events: broadcast::Sender<MonitorEvent>,
    time_series: Option<Arc<dyn TimeSeriesSink>>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    tasks: Mutex<JoinSet<()>>,
    max_in_flight: usize,
}

impl Publisher {
    #[must_use]
    pub fn new(
        time_series: Option<Arc<dyn TimeSeriesSink>>,
        alert_sink: Option<Arc<dyn AlertSink>>,
        max_in_flight: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events,
            time_series,
            alert_sink,
            tasks: Mutex::new(JoinSet::new()),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Side effects spawned and not yet reaped.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut tasks);
        tasks.len()
    }

    /// Publishes a completed cycle. Must be called from within the runtime.
    pub fn publish_cycle(&self, snapshot: Arc<Snapshot>, alerts: Vec<Alert>) {
        for alert in &alerts {
            tracing::warn!(
                "{}: {}",
                alert.severity.as_str().to_uppercase(),
                alert.message
            );
        }

        self.broadcast(MonitorEvent::Snapshot {
            snapshot: Arc::clone(&snapshot),
            alerts: alerts.clone(),
        });

        if let Some(sink) = &self.time_series {
            let sink = Arc::clone(sink);
            let snapshot = Arc::clone(&snapshot);
            self.spawn_side_effect("store write", async move {
                if let Err(e) = sink.write(&snapshot).await {
                    tracing::warn!("Failed to write snapshot: {e}");
                }
            });
        }

        if let Some(sink) = &self.alert_sink {
            for alert in alerts {
                let sink = Arc::clone(sink);
                self.spawn_side_effect("alert delivery", async move {
                    if let Err(e) = sink.notify(&alert).await {
                        tracing::warn!("Alert notification failed: {e}");
                    }
                });
            }
        }
    }

    pub fn publish_failure(&self, timestamp: DateTime<Utc>, error: String) {
        self.broadcast(MonitorEvent::CycleFailure { timestamp, error });
    }

    pub fn publish_thresholds(&self, thresholds: ThresholdSet) {
        self.broadcast(MonitorEvent::ThresholdsChanged { thresholds });
    }

    fn broadcast(&self, event: MonitorEvent) {
        let kind = event.kind();
        // Err only means nobody is listening.
        if self.events.send(event).is_err() {
            tracing::trace!("No subscribers for {kind} event");
        }
    }

    /// Returns `false` when the side effect was dropped.
    fn spawn_side_effect<F>(&self, label: &str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        reap(&mut tasks);
        if tasks.len() >= self.max_in_flight {
            tracing::warn!(
                "Dropping {label}: {} side effects already in flight",
                tasks.len()
            );
            return false;
        }
        tasks.spawn(task);
        true
    }

    /// Waits up to `timeout` for outstanding side effects, then aborts the
    /// rest. Returns how many were aborted.
    pub async fn drain(&self, timeout: Duration) -> usize {
        let mut tasks = {
            let mut guard = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        if tasks.is_empty() {
            return 0;
        }

        tracing::info!("Waiting for {} pending side effect(s)", tasks.len());
        let joined = tokio::time::timeout(timeout, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("Side effect task failed: {e}");
                }
            }
        })
        .await;

        if joined.is_ok() {
            return 0;
        }
        let aborted = tasks.len();
        tracing::warn!("Aborting {aborted} side effect(s) after {timeout:?}");
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        aborted
    }
}

fn reap(tasks: &mut JoinSet<()>) {
    while let Some(result) = tasks.try_join_next() {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::warn!("Side effect task panicked: {e}");
            }
        }
    }
}
