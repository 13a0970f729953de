use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::monitor::MonitorContext;
use crate::domain::value_objects::thresholds::ThresholdSet;

/// Shortest accepted collection interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Snapshot of the scheduler's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub last_cycle_time: Option<DateTime<Utc>>,
    pub subscriber_count: usize,
    pub thresholds: ThresholdSet,
}

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives [`MonitorContext::run_cycle`] on a fixed interval.
///
/// Idle until `start`, Running until `stop`. Both transitions are
/// idempotent. Each tick awaits a whole cycle; ticks missed meanwhile are
/// skipped, never replayed.
pub struct CollectionScheduler {
    context: Arc<MonitorContext>,
    lifecycle: Mutex<Option<RunningLoop>>,
    running: AtomicBool,
}

impl CollectionScheduler {
    #[must_use]
    pub fn new(context: Arc<MonitorContext>) -> Self {
        Self {
            context,
            lifecycle: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<MonitorContext> {
        &self.context
    }

    /// Runs one cycle to completion, then collects every `interval` until
    /// stopped. Intervals below [`MIN_INTERVAL`] are raised to it. A second
    /// call while running does nothing.
    pub async fn start(&self, interval: Duration) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            tracing::debug!("Collection already running");
            return;
        }

        let period = if interval < MIN_INTERVAL {
            tracing::warn!("Interval {interval:?} too short, using {MIN_INTERVAL:?}");
            MIN_INTERVAL
        } else {
            interval
        };
        self.running.store(true, Ordering::SeqCst);
        tracing::info!("Collection started (interval: {period:?})");

        // Failures are logged and published by the context.
        let _ = self.context.run_cycle().await;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let context = Arc::clone(&self.context);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let _ = context.run_cycle().await;
                    }
                }
            }
        });

        *lifecycle = Some(RunningLoop { token, handle });
    }

    /// Cancels the loop and waits for an in-progress cycle to finish. Does
    /// nothing when idle.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(running) = lifecycle.take() else {
            return;
        };
        running.token.cancel();
        if let Err(e) = running.handle.await {
            tracing::warn!("Collection loop ended abnormally: {e}");
        }
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Collection stopped");
    }

    /// Stops collecting and gives in-flight side effects up to `timeout` to
    /// finish. Returns how many were aborted.
    pub async fn shutdown(&self, timeout: Duration) -> usize {
        self.stop().await;
        self.context.drain(timeout).await
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn run_status(&self) -> RunStatus {
        RunStatus {
            running: self.is_running(),
            last_cycle_time: self.context.last_cycle_time(),
            subscriber_count: self.context.subscriber_count(),
            thresholds: self.context.thresholds(),
        }
    }
}
