use async_trait::async_trait;

use crate::domain::entities::alert::Alert;
use crate::domain::ports::notifier::{AlertSink, NotificationError};

/// Forwards alerts to multiple sinks.
///
/// Calls each sink in order and returns the first error encountered (if
/// any), but always calls all of them.
pub struct CompositeNotifier {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl CompositeNotifier {
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Default for CompositeNotifier {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl AlertSink for CompositeNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(alert).await {
                tracing::warn!("Notification failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
