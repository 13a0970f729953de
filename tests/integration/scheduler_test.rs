#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use hostpulse::application::services::monitor::{Collaborators, MonitorContext};
use hostpulse::application::services::scheduler::CollectionScheduler;
use hostpulse::domain::entities::event::MonitorEvent;
use hostpulse::domain::entities::reading::{
    CpuReading, FilesystemReading, MemoryReading, SensorUnavailable, Subsystem,
};
use hostpulse::domain::ports::sensor::{SensorSource, SubsystemData};
use hostpulse::domain::ports::store::{HistoricalQuery, TimeSeriesSink};
use hostpulse::domain::value_objects::metric_key::MetricKey;
use hostpulse::infrastructure::persistence::{JsonThresholdStore, SqliteStore};

// ---------------------------------------------------------------------------
// SteadyHost
// ---------------------------------------------------------------------------

/// CPU climbs by one point per cycle; memory and root disk are fixed.
#[derive(Default)]
struct SteadyHost {
    cycles: AtomicUsize,
}

#[async_trait]
impl SensorSource for SteadyHost {
    #[allow(clippy::cast_precision_loss)]
    async fn fetch(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
        match subsystem {
            Subsystem::Cpu => {
                let n = self.cycles.fetch_add(1, Ordering::SeqCst);
                Ok(SubsystemData::Cpu(CpuReading {
                    load_percent: 10.0 + n as f64,
                    ..CpuReading::default()
                }))
            }
            Subsystem::Memory => Ok(SubsystemData::Memory(MemoryReading {
                total_bytes: 4_000,
                used_bytes: 1_000,
                available_bytes: 3_000,
            })),
            Subsystem::Filesystems => Ok(SubsystemData::Filesystems(vec![FilesystemReading {
                mount: "/".to_string(),
                fs_type: "xfs".to_string(),
                size_bytes: 1_000,
                used_bytes: 500,
            }])),
            other => Err(SensorUnavailable::new(other, "not on this test host")),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn context_in(dir: &std::path::Path, host: Arc<SteadyHost>) -> Arc<MonitorContext> {
    let db_path = dir.join("data").join("metrics.db");
    let store = Arc::new(
        SqliteStore::new(db_path.to_str().expect("utf-8 path")).expect("open database"),
    );
    let time_series: Arc<dyn TimeSeriesSink> = store.clone();
    let history: Arc<dyn HistoricalQuery> = store;
    Arc::new(MonitorContext::new(
        Collaborators {
            sensors: host,
            config_store: Arc::new(JsonThresholdStore::new(dir.join("thresholds.json"))),
            time_series: Some(time_series),
            history: Some(history),
            alerts: None,
        },
        16,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scheduled_cycles_reach_subscribers_and_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = Arc::new(SteadyHost::default());
    let scheduler = CollectionScheduler::new(context_in(dir.path(), host.clone()));
    let mut rx = scheduler.context().subscribe();

    scheduler.start(Duration::from_millis(100)).await;
    assert!(scheduler.run_status().running);
    tokio::time::sleep(Duration::from_millis(350)).await;
    let aborted = scheduler.shutdown(Duration::from_secs(5)).await;
    assert_eq!(aborted, 0);
    assert!(!scheduler.is_running());

    let cycles = host.cycles.load(Ordering::SeqCst);
    assert!(cycles >= 3, "expected at least 3 cycles, got {cycles}");

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let MonitorEvent::Snapshot { snapshot, .. } = event {
            seen.push(snapshot.metrics.cpu_usage);
        }
    }
    assert_eq!(seen.len(), cycles);
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "cycles ran out of order: {seen:?}");

    let cpu = scheduler.context().historical_data("cpu_usage", "1h").await;
    assert_eq!(cpu.len(), cycles);
    assert!((cpu[0].value - 10.0).abs() < 1e-9);

    let memory = scheduler.context().historical_data("memory_usage", "1h").await;
    assert!(memory.iter().all(|p| (p.value - 25.0).abs() < 1e-9));
}

#[tokio::test]
async fn thresholds_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first = context_in(dir.path(), Arc::new(SteadyHost::default()));
    let update = json!({"disk_usage": 40, "load_average": 0});
    let outcome = first.update_thresholds(update.as_object().expect("object"));
    assert!(outcome.changed);
    assert!(dir.path().join("thresholds.json").exists());

    let second = context_in(dir.path(), Arc::new(SteadyHost::default()));
    let thresholds = second.thresholds();
    assert_eq!(thresholds.get(MetricKey::DiskUsage), Some(40.0));
    assert_eq!(thresholds.limit(MetricKey::LoadAverage), None);
    assert_eq!(thresholds.get(MetricKey::CpuUsage), Some(80.0));

    let report = second.run_cycle().await.expect("cycle");
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].metric, MetricKey::DiskUsage);
}

#[tokio::test]
async fn restart_after_stop_resumes_collection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = Arc::new(SteadyHost::default());
    let scheduler = CollectionScheduler::new(context_in(dir.path(), host.clone()));

    scheduler.start(Duration::from_secs(3600)).await;
    scheduler.stop().await;
    assert_eq!(host.cycles.load(Ordering::SeqCst), 1);

    scheduler.start(Duration::from_secs(3600)).await;
    assert!(scheduler.is_running());
    assert_eq!(host.cycles.load(Ordering::SeqCst), 2);
    scheduler.stop().await;

    let status = scheduler.run_status();
    assert!(!status.running);
    assert!(status.last_cycle_time.is_some());
}
