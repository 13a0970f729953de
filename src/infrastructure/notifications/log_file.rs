use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{AlertSink, NotificationError};

const DEFAULT_LOG_PATH: &str = "~/.local/share/hostpulse/alerts.log";

/// Appends every alert as one JSON object per line.
pub struct LogFileNotifier {
    path: PathBuf,
}

impl LogFileNotifier {
    #[must_use]
    pub fn new(path: &str) -> Self {
        let expanded = shellexpand::tilde(path);
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }
}

impl Default for LogFileNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

fn append_json_line(path: &Path, value: &serde_json::Value) -> Result<(), NotificationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            NotificationError::SendFailed(format!("cannot create parent directory: {e}"))
        })?;
    }

    let json = serde_json::to_string(value)
        .map_err(|e| NotificationError::SendFailed(format!("JSON serialization failed: {e}")))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| NotificationError::SendFailed(format!("cannot open alert log: {e}")))?;

    writeln!(file, "{json}")
        .map_err(|e| NotificationError::SendFailed(format!("cannot write alert log: {e}")))
}

#[async_trait]
impl AlertSink for LogFileNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let entry = serde_json::to_value(alert)
            .map_err(|e| NotificationError::SendFailed(format!("JSON serialization failed: {e}")))?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_json_line(&path, &entry))
            .await
            .map_err(|e| NotificationError::SendFailed(format!("alert log task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::domain::value_objects::metric_key::MetricKey;
    use chrono::Utc;

    fn notifier_in(dir: &tempfile::TempDir) -> (LogFileNotifier, PathBuf) {
        let path = dir.path().join("logs").join("alerts.log");
        (LogFileNotifier { path: path.clone() }, path)
    }

    #[test]
    fn new_expands_tilde() {
        let notifier = LogFileNotifier::new("~/test/alerts.log");
        let path_str = notifier.path.to_string_lossy();
        assert!(!path_str.starts_with('~'), "tilde should be expanded");
        assert!(path_str.ends_with("test/alerts.log"));
    }

    #[test]
    fn default_uses_standard_path() {
        let notifier = LogFileNotifier::default();
        assert!(
            notifier
                .path
                .to_string_lossy()
                .ends_with(".local/share/hostpulse/alerts.log")
        );
    }

    #[tokio::test]
    async fn notify_writes_json_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (notifier, path) = notifier_in(&dir);

        let alert = Alert::breach(MetricKey::DiskUsage, 91.0, 80.0, Utc::now());
        notifier.notify(&alert).await.expect("notify");

        let content = std::fs::read_to_string(&path).expect("read log");
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).expect("parse JSON");
        assert_eq!(parsed["metric"], "disk_usage");
        assert_eq!(parsed["severity"], "warning");
        assert_eq!(parsed["message"], alert.message);
    }

    #[tokio::test]
    async fn notify_appends_multiple_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (notifier, path) = notifier_in(&dir);

        notifier
            .notify(&Alert::breach(MetricKey::CpuUsage, 85.0, 80.0, Utc::now()))
            .await
            .expect("first");
        notifier
            .notify(&Alert::breach(MetricKey::LoadAverage, 9.0, 4.0, Utc::now()))
            .await
            .expect("second");

        let content = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).expect("parse");
        assert_eq!(second["metric"], "load_average");
    }
}
