use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use hostpulse::application::config::{AppConfig, expand_path};
use hostpulse::application::services::monitor::{Collaborators, MonitorContext};
use hostpulse::application::services::scheduler::CollectionScheduler;
use hostpulse::domain::ports::notifier::AlertSink;
use hostpulse::domain::ports::store::{HistoricalQuery, TimeSeriesSink};
use hostpulse::infrastructure::notifications::{
    CompositeNotifier, LogFileNotifier, WebhookNotifier,
};
use hostpulse::infrastructure::persistence::{InMemoryStore, JsonThresholdStore, SqliteStore};
use hostpulse::infrastructure::sensors::SysinfoSource;
use hostpulse::presentation::cli::app::{Cli, Commands};
use hostpulse::presentation::cli::commands::daemon::run_daemon;
use hostpulse::presentation::cli::commands::history::run_history;
use hostpulse::presentation::cli::commands::snapshot::run_snapshot;
use hostpulse::presentation::cli::commands::thresholds::run_thresholds;

fn print_banner() {
    println!("{}", "━".repeat(40).cyan());
    println!("{}", "  HOSTPULSE — Host Telemetry".bold().cyan());
    println!("{}", "━".repeat(40).cyan());
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

type Storage = (Arc<dyn TimeSeriesSink>, Arc<dyn HistoricalQuery>);

/// The configured database, or an in-memory store when storage is disabled.
/// A database that cannot be opened leaves the engine without storage.
fn open_storage(config: &AppConfig, no_store: bool) -> Option<Storage> {
    if no_store || !config.storage.enabled {
        tracing::debug!("Samples kept in memory only");
        let store = Arc::new(InMemoryStore::new());
        let sink: Arc<dyn TimeSeriesSink> = store.clone();
        return Some((sink, store));
    }

    match SqliteStore::new(&config.storage.path) {
        Ok(store) => {
            match store.cleanup_old(config.storage.retention_hours) {
                Ok(0) => {}
                Ok(deleted) => tracing::debug!("Removed {deleted} expired sample(s)"),
                Err(e) => tracing::warn!("Failed to clean up old samples: {e}"),
            }
            let store = Arc::new(store);
            let sink: Arc<dyn TimeSeriesSink> = store.clone();
            Some((sink, store))
        }
        Err(e) => {
            tracing::warn!("Time-series store unavailable, running without it: {e}");
            None
        }
    }
}

fn build_notifier(config: &AppConfig) -> Option<Arc<dyn AlertSink>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if let Some(ref url) = config.notifications.webhook_url {
        let hostname = sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string());
        match WebhookNotifier::new(url.clone(), hostname) {
            Ok(notifier) => sinks.push(Box::new(notifier)),
            Err(e) => tracing::warn!("Webhook disabled: {e}"),
        }
    } else {
        tracing::debug!("No webhook configured, alerts are only logged");
    }
    if let Some(ref path) = config.notifications.alert_log {
        sinks.push(Box::new(LogFileNotifier::new(path)));
    }

    let composite = CompositeNotifier::new(sinks);
    if composite.is_empty() {
        None
    } else {
        Some(Arc::new(composite))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        AppConfig::load_from(path)?
    } else {
        AppConfig::load()?
    }
    .with_env_overrides();

    // Manual DI: main.rs is the only place that knows concrete types
    let sensors = tokio::task::spawn_blocking(SysinfoSource::new).await?;
    let (time_series, history) = open_storage(&config, cli.no_store).unzip();
    let context = Arc::new(MonitorContext::new(
        Collaborators {
            sensors: Arc::new(sensors),
            config_store: Arc::new(JsonThresholdStore::new(expand_path(
                &config.thresholds.path,
            ))),
            time_series,
            history,
            alerts: build_notifier(&config),
        },
        config.general.max_in_flight_tasks,
    ));

    match cli.command.unwrap_or(Commands::Daemon { interval_ms: None }) {
        Commands::Snapshot { json } => {
            run_snapshot(&context, json).await?;
            context.drain(config.general.shutdown_timeout()).await;
        }
        Commands::History {
            metric,
            range,
            json,
        } => {
            run_history(&context, &metric, range.as_deref(), json).await?;
        }
        Commands::Thresholds { updates, json } => {
            run_thresholds(&context, &updates, json)?;
        }
        Commands::Daemon { interval_ms } => {
            let interval =
                interval_ms.map_or_else(|| config.general.interval(), Duration::from_millis);
            print_banner();
            let scheduler = CollectionScheduler::new(context);
            run_daemon(&scheduler, interval, config.general.shutdown_timeout()).await?;
        }
    }

    Ok(())
}
