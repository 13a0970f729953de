use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::alert::Alert;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("notification channel unavailable: {0}")]
    ChannelUnavailable(String),
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns `NotificationError` if the notification fails to send
    /// or the channel is unavailable.
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError>;
}
