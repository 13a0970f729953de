#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::json;

use hostpulse::application::services::monitor::{Collaborators, MonitorContext};
use hostpulse::domain::entities::alert::Alert;
use hostpulse::domain::entities::event::MonitorEvent;
use hostpulse::domain::entities::reading::{
    BatteryReading, ConnectionReading, CpuReading, DiskIoReading, FilesystemReading,
    InterfaceReading, MemoryReading, OsReading, ProcessListReading, ProcessReading,
    SensorUnavailable, Subsystem,
};
use hostpulse::domain::ports::notifier::{AlertSink, NotificationError};
use hostpulse::domain::ports::sensor::{SensorSource, SubsystemData};
use hostpulse::domain::ports::store::{HistoricalQuery, TimeSeriesSink};
use hostpulse::domain::value_objects::metric_key::MetricKey;
use hostpulse::domain::value_objects::severity::Severity;
use hostpulse::infrastructure::persistence::InMemoryStore;

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

/// Sensor double for a small Linux box. CPU load and the eth0 / disk
/// counters are adjustable between cycles.
struct FakeHost {
    cpu: Mutex<f64>,
    memory: MemoryReading,
    eth0_rx: AtomicU64,
    eth0_tx: AtomicU64,
    disk_reads_per_sec: Mutex<f64>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            cpu: Mutex::new(12.0),
            memory: MemoryReading {
                total_bytes: 8 * 1024 * 1024 * 1024,
                used_bytes: 2 * 1024 * 1024 * 1024,
                available_bytes: 6 * 1024 * 1024 * 1024,
            },
            eth0_rx: AtomicU64::new(0),
            eth0_tx: AtomicU64::new(0),
            disk_reads_per_sec: Mutex::new(0.0),
        }
    }

    fn with_memory(memory: MemoryReading) -> Self {
        Self {
            memory,
            ..Self::new()
        }
    }

    fn set_cpu(&self, value: f64) {
        *self.cpu.lock().expect("lock") = value;
    }
}

#[async_trait]
impl SensorSource for FakeHost {
    async fn fetch(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
        let data = match subsystem {
            Subsystem::Cpu => SubsystemData::Cpu(CpuReading {
                load_percent: *self.cpu.lock().expect("lock"),
                per_core_load: vec![10.0, 14.0],
                cores: 2,
                speed_mhz: 2400,
                load_average: [0.5, 0.4, 0.3],
                ..CpuReading::default()
            }),
            Subsystem::Memory => SubsystemData::Memory(self.memory.clone()),
            Subsystem::Filesystems => SubsystemData::Filesystems(vec![FilesystemReading {
                mount: "/".to_string(),
                fs_type: "ext4".to_string(),
                size_bytes: 100_000,
                used_bytes: 42_000,
            }]),
            Subsystem::Network => SubsystemData::Network(vec![
                InterfaceReading {
                    name: "eth0".to_string(),
                    rx_bytes: self.eth0_rx.load(Ordering::SeqCst),
                    tx_bytes: self.eth0_tx.load(Ordering::SeqCst),
                    ..InterfaceReading::default()
                },
                InterfaceReading {
                    name: "lo".to_string(),
                    rx_bytes: 999_999,
                    tx_bytes: 999_999,
                    ..InterfaceReading::default()
                },
            ]),
            Subsystem::DiskIo => SubsystemData::DiskIo(DiskIoReading {
                read_ops: 100,
                write_ops: 50,
                read_ops_per_sec: *self.disk_reads_per_sec.lock().expect("lock"),
                write_ops_per_sec: 0.0,
            }),
            Subsystem::Processes => SubsystemData::Processes(ProcessListReading {
                total: 2,
                list: vec![
                    ProcessReading {
                        pid: 1,
                        name: "init".to_string(),
                        cpu_percent: 0.1,
                        memory_bytes: 4096,
                        state: "sleeping".to_string(),
                    },
                    ProcessReading {
                        pid: 812,
                        name: "postgres".to_string(),
                        cpu_percent: 7.5,
                        memory_bytes: 1 << 28,
                        state: "running".to_string(),
                    },
                ],
            }),
            Subsystem::Connections => SubsystemData::Connections(vec![
                ConnectionReading {
                    state: "ESTABLISHED".to_string(),
                },
                ConnectionReading {
                    state: "LISTEN".to_string(),
                },
            ]),
            Subsystem::Os => SubsystemData::Os(OsReading {
                platform: "linux".to_string(),
                hostname: "box-01".to_string(),
                arch: "x86_64".to_string(),
                kernel: "6.1.0".to_string(),
                distro: "Debian GNU/Linux 12".to_string(),
                uptime_seconds: 3600,
            }),
            Subsystem::Battery => SubsystemData::Battery(None::<BatteryReading>),
            Subsystem::Services => {
                return Err(SensorUnavailable::new(subsystem, "systemctl not found"));
            }
        };
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// TrackingSink
// ---------------------------------------------------------------------------

struct TrackingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl TrackingSink {
    const fn new() -> Self {
        Self {
            alerts: Mutex::new(vec![]),
        }
    }

    fn delivered(&self) -> Vec<Alert> {
        self.alerts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AlertSink for TrackingSink {
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        self.alerts.lock().expect("lock").push(alert.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    host: Arc<FakeHost>,
    store: Arc<InMemoryStore>,
    sink: Arc<TrackingSink>,
    context: MonitorContext,
}

fn harness_with(host: FakeHost) -> Harness {
    let host = Arc::new(host);
    let store = Arc::new(InMemoryStore::new());
    let sink = Arc::new(TrackingSink::new());
    let time_series: Arc<dyn TimeSeriesSink> = store.clone();
    let history: Arc<dyn HistoricalQuery> = store.clone();
    let alerts: Arc<dyn AlertSink> = sink.clone();
    let context = MonitorContext::new(
        Collaborators {
            sensors: host.clone(),
            config_store: store.clone(),
            time_series: Some(time_series),
            history: Some(history),
            alerts: Some(alerts),
        },
        16,
    );
    Harness {
        host,
        store,
        sink,
        context,
    }
}

fn harness() -> Harness {
    harness_with(FakeHost::new())
}

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
}

const DRAIN: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cycle_produces_a_complete_snapshot() {
    let h = harness();
    let report = h.context.run_cycle_at(t0()).await.expect("cycle");
    let snapshot = &report.snapshot;

    assert_eq!(snapshot.timestamp, t0());
    assert!((snapshot.metrics.cpu_usage - 12.0).abs() < 1e-9);
    assert!((snapshot.metrics.memory_usage - 25.0).abs() < 1e-9);
    assert!((snapshot.metrics.disk_usage - 42.0).abs() < 1e-9);
    assert_eq!(snapshot.metrics.process_count, 2);
    assert_eq!(snapshot.metrics.connection_count, 2);
    assert_eq!(snapshot.metrics.uptime_seconds, 3600);
    assert_eq!(snapshot.details.system.hostname, "box-01");
    assert!(snapshot.details.battery.is_none());
    assert_eq!(report.unavailable, vec![Subsystem::Services]);
    assert!(report.alerts.is_empty());
}

#[tokio::test]
async fn network_rate_follows_primary_interface() {
    let h = harness();
    h.host.eth0_rx.store(10_000, Ordering::SeqCst);
    h.host.eth0_tx.store(2_000, Ordering::SeqCst);
    let first = h.context.run_cycle_at(t0()).await.expect("first");
    assert_eq!(first.snapshot.rates.network_rx_rate, 0.0);
    assert_eq!(first.snapshot.rates.network_tx_rate, 0.0);

    h.host.eth0_rx.store(70_000, Ordering::SeqCst);
    h.host.eth0_tx.store(5_000, Ordering::SeqCst);
    let second = h
        .context
        .run_cycle_at(t0() + TimeDelta::seconds(5))
        .await
        .expect("second");
    assert!((second.snapshot.rates.network_rx_rate - 12_000.0).abs() < f64::EPSILON);
    assert!((second.snapshot.rates.network_tx_rate - 600.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn counter_reset_never_yields_negative_rate() {
    let h = harness();
    h.host.eth0_rx.store(50_000, Ordering::SeqCst);
    h.context.run_cycle_at(t0()).await.expect("first");

    h.host.eth0_rx.store(1_000, Ordering::SeqCst);
    let report = h
        .context
        .run_cycle_at(t0() + TimeDelta::seconds(1))
        .await
        .expect("second");
    assert_eq!(report.snapshot.rates.network_rx_rate, 0.0);
}

#[tokio::test]
async fn zero_total_memory_reports_zero_usage() {
    let h = harness_with(FakeHost::with_memory(MemoryReading::default()));
    let report = h.context.run_cycle_at(t0()).await.expect("cycle");
    assert_eq!(report.snapshot.metrics.memory_usage, 0.0);
    assert!(report.snapshot.metrics.memory_usage.is_finite());
}

#[tokio::test]
async fn repeated_breach_is_suppressed_for_five_minutes() {
    let h = harness();
    let update = json!({"cpu_usage": 80});
    let outcome = h
        .context
        .update_thresholds(update.as_object().expect("object"));
    assert!(outcome.rejected.is_empty());

    h.host.set_cpu(85.0);
    let first = h.context.run_cycle_at(t0()).await.expect("cycle");
    assert_eq!(first.alerts.len(), 1);
    assert_eq!(first.alerts[0].metric, MetricKey::CpuUsage);
    assert_eq!(first.alerts[0].severity, Severity::Warning);

    h.host.set_cpu(99.0);
    let suppressed = h
        .context
        .run_cycle_at(t0() + TimeDelta::seconds(60))
        .await
        .expect("cycle");
    assert!(suppressed.alerts.is_empty());

    let later = h
        .context
        .run_cycle_at(t0() + TimeDelta::seconds(301))
        .await
        .expect("cycle");
    assert_eq!(later.alerts.len(), 1);
    assert_eq!(later.alerts[0].severity, Severity::Critical);

    assert_eq!(h.context.drain(DRAIN).await, 0);
    let delivered = h.sink.delivered();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].severity, Severity::Warning);
    assert_eq!(delivered[1].severity, Severity::Critical);
}

#[tokio::test]
async fn subscribers_receive_each_cycle() {
    let h = harness();
    let mut rx = h.context.subscribe();

    h.host.set_cpu(95.0);
    h.context.run_cycle_at(t0()).await.expect("cycle");

    match rx.recv().await.expect("event") {
        MonitorEvent::Snapshot { snapshot, alerts } => {
            assert!((snapshot.metrics.cpu_usage - 95.0).abs() < 1e-9);
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].metric, MetricKey::CpuUsage);
        }
        other => panic!("expected snapshot event, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_threshold_keeps_previous_value() {
    let h = harness();
    let update = json!({"memory_usage": 150, "cpu_usage": 70, "bogus": 3});
    let outcome = h
        .context
        .update_thresholds(update.as_object().expect("object"));

    assert!(outcome.changed);
    assert_eq!(outcome.rejected.len(), 2);
    assert_eq!(outcome.thresholds.get(MetricKey::CpuUsage), Some(70.0));
    assert_eq!(outcome.thresholds.get(MetricKey::MemoryUsage), Some(85.0));
    assert_eq!(h.context.thresholds(), outcome.thresholds);
}

#[tokio::test]
async fn history_returns_written_cycles() {
    let h = harness();
    h.host.set_cpu(20.0);
    h.context.run_cycle().await.expect("cycle");
    h.host.set_cpu(40.0);
    h.context.run_cycle().await.expect("cycle");
    assert_eq!(h.context.drain(DRAIN).await, 0);
    assert!(h.store.sample_count() >= 40);

    let cpu = h.context.historical_data("cpu_usage", "1h").await;
    let values: Vec<f64> = cpu.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![20.0, 40.0]);
    assert!(cpu.iter().all(|p| p.field.is_none()));

    let disk_io = h.context.historical_data("disk_io", "").await;
    assert_eq!(disk_io.len(), 4);
    assert!(disk_io.iter().all(|p| p.field.is_some()));

    assert!(h.context.historical_data("gpu_usage", "1h").await.is_empty());
}

#[tokio::test]
async fn disk_rate_comes_from_sensor_after_first_sample() {
    let h = harness();
    *h.host.disk_reads_per_sec.lock().expect("lock") = 37.4;
    let first = h.context.run_cycle_at(t0()).await.expect("cycle");
    assert_eq!(first.snapshot.rates.disk_read_rate, 0.0);

    let second = h
        .context
        .run_cycle_at(t0() + TimeDelta::seconds(1))
        .await
        .expect("cycle");
    assert!((second.snapshot.rates.disk_read_rate - 37.0).abs() < f64::EPSILON);
    assert_eq!(second.snapshot.rates.disk_write_rate, 0.0);
}
