use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use async_trait::async_trait;

/// Fallback transport: writes the alert to the log.
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        LogNotifier
    }
}

#[async_trait]
impl NotifierPlugin for LogNotifier {
    fn name(&self) -> &str {
        "Log Notifier"
    }

    fn plugin_type(&self) -> &str {
        "log"
    }

    fn description(&self) -> &str {
        "Writes price-drop alerts to the application log"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        tracing::warn!(
            title = %event.title,
            price = %event.price,
            target_price = %event.target_price,
            url = %event.target_url,
            "Price drop alert"
        );
        Ok(NotificationResult::delivered(format!("log-{}", event.observed_at.timestamp())))
    }
}
