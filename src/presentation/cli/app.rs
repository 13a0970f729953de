use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hostpulse: host telemetry collector
///
/// Samples CPU, memory, disk, network and process telemetry, derives
/// rates and raises threshold alerts.
#[derive(Parser, Debug)]
#[command(name = "hostpulse")]
#[command(version, about, long_about)]
pub struct Cli {
    /// Subcommand to execute (defaults to `daemon`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to custom config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Keep samples in memory instead of the configured database
    #[arg(long, global = true)]
    pub no_store: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect continuously until interrupted
    #[command(alias = "d")]
    Daemon {
        /// Collection interval override in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Take one snapshot and print it
    #[command(alias = "s")]
    Snapshot {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Query stored samples of one metric
    #[command(alias = "h")]
    History {
        /// cpu_usage, memory_usage, disk_usage, system_load or disk_io
        metric: String,

        /// Time window such as 30m, 6h or 7d (default: 1h)
        #[arg(short, long)]
        range: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or update alert thresholds
    #[command(alias = "t")]
    Thresholds {
        /// Updates as KEY=VALUE, e.g. cpu_usage=90
        updates: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
