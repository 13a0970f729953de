use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{AlertSink, NotificationError};

/// Webhook notification format, auto-detected from the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WebhookFormat {
    Slack,
    Discord,
    Generic,
}

/// Sends threshold alerts to an HTTP webhook endpoint.
///
/// Supports Discord (embeds), Slack (colored attachments) and generic JSON
/// payloads. The format is auto-detected from the webhook URL.
pub struct WebhookNotifier {
    url: String,
    hostname: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a new webhook notifier targeting the given URL. `hostname`
    /// is shown in the payload footer.
    ///
    /// The HTTP client is configured with a 5-second timeout covering
    /// DNS resolution, connection, and response.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError::ChannelUnavailable` if the HTTP client
    /// cannot be initialized (e.g. TLS backend failure).
    pub fn new(url: String, hostname: String) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                NotificationError::ChannelUnavailable(format!("cannot build HTTP client: {e}"))
            })?;

        Ok(Self {
            url,
            hostname,
            client,
        })
    }

    fn detect_format(&self) -> WebhookFormat {
        // Extract host from URL (scheme://host/path) to avoid substring false positives
        let host = self
            .url
            .split("//")
            .nth(1)
            .and_then(|s| s.split('/').next())
            .and_then(|h| h.split(':').next())
            .unwrap_or("");

        if host == "hooks.slack.com" {
            WebhookFormat::Slack
        } else if host == "discord.com" || host == "discordapp.com" {
            WebhookFormat::Discord
        } else {
            WebhookFormat::Generic
        }
    }

    fn format_alert(&self, alert: &Alert) -> Value {
        match self.detect_format() {
            WebhookFormat::Slack => self.format_alert_slack(alert),
            WebhookFormat::Discord => self.format_alert_discord(alert),
            WebhookFormat::Generic => self.format_alert_generic(alert),
        }
    }

    fn title(alert: &Alert) -> String {
        format!(
            "{} Alert: {}",
            alert.severity.as_str().to_uppercase(),
            alert.metric.label()
        )
    }

    fn current_value(alert: &Alert) -> String {
        format!("{:.2}{}", alert.value, alert.unit)
    }

    fn threshold_value(alert: &Alert) -> String {
        format!("{}{}", alert.threshold, alert.unit)
    }

    fn format_alert_discord(&self, alert: &Alert) -> Value {
        json!({
            "embeds": [{
                "title": Self::title(alert),
                "description": &alert.message,
                "color": alert.severity.color_decimal(),
                "fields": [
                    { "name": "Current Value", "value": Self::current_value(alert), "inline": true },
                    { "name": "Threshold", "value": Self::threshold_value(alert), "inline": true }
                ],
                "timestamp": alert.timestamp.to_rfc3339(),
                "footer": { "text": format!("Hostname: {}", self.hostname) }
            }]
        })
    }

    fn format_alert_slack(&self, alert: &Alert) -> Value {
        json!({
            "attachments": [{
                "color": alert.severity.color_hex(),
                "title": Self::title(alert),
                "text": &alert.message,
                "fields": [
                    { "title": "Current Value", "value": Self::current_value(alert), "short": true },
                    { "title": "Threshold", "value": Self::threshold_value(alert), "short": true }
                ],
                "footer": format!("Hostname: {}", self.hostname),
                "ts": alert.timestamp.timestamp()
            }]
        })
    }

    fn format_alert_generic(&self, alert: &Alert) -> Value {
        json!({
            "source": "hostpulse",
            "hostname": &self.hostname,
            "severity": alert.severity.as_str(),
            "metric": alert.metric.as_str(),
            "value": alert.value,
            "threshold": alert.threshold,
            "unit": &alert.unit,
            "message": &alert.message,
            "timestamp": alert.timestamp.to_rfc3339()
        })
    }
}

#[async_trait]
impl AlertSink for WebhookNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let payload = self.format_alert(alert);
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("webhook error: {e}")))?;

        if !response.status().is_success() {
            return Err(NotificationError::SendFailed(format!(
                "webhook HTTP {}",
                response.status()
            )));
        }
        tracing::debug!(
            "Sent {} alert for {} to webhook",
            alert.severity.as_str(),
            alert.metric
        );
        Ok(())
    }
}
