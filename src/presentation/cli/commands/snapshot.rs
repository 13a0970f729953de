use std::time::Duration;

use anyhow::Context;
use serde_json::json;

use crate::application::services::monitor::{CycleReport, MonitorContext};
use crate::presentation::cli::formatters::alert_fmt::render_alerts;
use crate::presentation::cli::formatters::snapshot_fmt::render_snapshot;

/// Pause between the priming cycle and the reported one, so rates and CPU
/// usage have a baseline.
pub const WARMUP: Duration = Duration::from_millis(500);

/// Runs a priming cycle, waits `warmup`, then returns the second cycle.
///
/// # Errors
///
/// Returns an error if either cycle fails.
pub async fn capture(context: &MonitorContext, warmup: Duration) -> anyhow::Result<CycleReport> {
    context
        .run_cycle()
        .await
        .context("Priming collection cycle failed")?;
    tokio::time::sleep(warmup).await;
    context
        .run_cycle()
        .await
        .context("Collection cycle failed")
}

/// # Errors
///
/// Returns an error if collection or JSON serialization fails.
pub async fn run_snapshot(context: &MonitorContext, json: bool) -> anyhow::Result<()> {
    let report = capture(context, WARMUP).await?;

    if json {
        let body = json!({
            "snapshot": &*report.snapshot,
            "alerts": &report.alerts,
            "unavailable": &report.unavailable,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    print!("{}", render_snapshot(&report.snapshot, &context.thresholds()));
    println!();
    print!("{}", render_alerts(&report.alerts));
    if !report.unavailable.is_empty() {
        let names: Vec<&str> = report.unavailable.iter().map(|s| s.as_str()).collect();
        println!("Unavailable sensors: {}", names.join(", "));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::services::monitor::Collaborators;
    use crate::domain::entities::reading::{
        InterfaceReading, MemoryReading, SensorUnavailable, Subsystem,
    };
    use crate::domain::ports::sensor::{SensorSource, SubsystemData};
    use crate::infrastructure::persistence::in_memory_store::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Interface counters grow by 1000 bytes per fetch.
    #[derive(Default)]
    struct GrowingSensors {
        rx: AtomicU64,
    }

    #[async_trait]
    impl SensorSource for GrowingSensors {
        async fn fetch(&self, subsystem: Subsystem) -> Result<SubsystemData, SensorUnavailable> {
            match subsystem {
                Subsystem::Memory => Ok(SubsystemData::Memory(MemoryReading {
                    total_bytes: 1000,
                    used_bytes: 250,
                    available_bytes: 750,
                })),
                Subsystem::Network => {
                    let rx = self.rx.fetch_add(1000, Ordering::SeqCst) + 1000;
                    Ok(SubsystemData::Network(vec![InterfaceReading {
                        name: "eth0".to_string(),
                        rx_bytes: rx,
                        ..InterfaceReading::default()
                    }]))
                }
                other => Err(SensorUnavailable::new(other, "not simulated")),
            }
        }
    }

    #[tokio::test]
    async fn capture_primes_rates() {
        let store = Arc::new(InMemoryStore::new());
        let context = MonitorContext::new(
            Collaborators {
                sensors: Arc::new(GrowingSensors::default()),
                config_store: store,
                time_series: None,
                history: None,
                alerts: None,
            },
            4,
        );

        let report = capture(&context, Duration::from_millis(200))
            .await
            .expect("capture");
        assert!((report.snapshot.metrics.memory_usage - 25.0).abs() < f64::EPSILON);
        assert!(report.snapshot.rates.network_rx_rate > 0.0);
        assert!(report.unavailable.contains(&Subsystem::Cpu));
    }
}
