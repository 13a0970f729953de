use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `notifications.webhook_url`.
pub const WEBHOOK_ENV_VAR: &str = "DISCORD_WEBHOOK_URL";

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub thresholds: ThresholdFileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Collection cadence and task limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_tasks: usize,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Where the threshold set is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdFileConfig {
    #[serde(default = "default_thresholds_path")]
    pub path: String,
}

/// Time-series storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

/// Alert delivery channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub alert_log: Option<String>,
}

// --- Defaults ---

const fn default_interval_ms() -> u64 {
    2000
}

const fn default_max_in_flight() -> usize {
    64
}

const fn default_shutdown_timeout() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_retention_hours() -> u64 {
    72
}

// NOTE: Paths are stored with the tilde; expand with `expand_path` at point of use.
fn default_thresholds_path() -> String {
    "~/.config/hostpulse/thresholds.json".into()
}

fn default_storage_path() -> String {
    "~/.local/share/hostpulse/metrics.db".into()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_in_flight_tasks: default_max_in_flight(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ThresholdFileConfig {
    fn default() -> Self {
        Self {
            path: default_thresholds_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_storage_path(),
            retention_hours: default_retention_hours(),
        }
    }
}

/// Expands a leading `~` in a configured path.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Applies `DISCORD_WEBHOOK_URL` from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_webhook_override(std::env::var(WEBHOOK_ENV_VAR).ok())
    }

    /// A non-empty `url` replaces the configured webhook.
    #[must_use]
    pub fn with_webhook_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.notifications.webhook_url = Some(url);
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("hostpulse").join("config.toml"))
    }
}
