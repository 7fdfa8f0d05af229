use crate::config::DiscordConfig;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
    currency_symbol: String,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig, currency_symbol: &str) -> Self {
        DiscordNotifier {
            client: Client::new(),
            config,
            currency_symbol: currency_symbol.to_string(),
        }
    }

    fn create_embed(&self, event: &NotificationEvent) -> serde_json::Value {
        json!({
            "title": format!("📉 {}", event.title),
            "url": event.target_url,
            "color": 0x00ff00, // Green for price drops
            "timestamp": event.observed_at.to_rfc3339(),
            "fields": [
                {
                    "name": "💰 Price Drop!",
                    "value": format!("**Now:** {}{}\n**Target:** {}{}",
                                     self.currency_symbol, event.price,
                                     self.currency_symbol, event.target_price),
                    "inline": false
                },
                {
                    "name": "🏪 Product page",
                    "value": format!("[Open listing]({})", event.target_url),
                    "inline": true
                }
            ],
            "footer": { "text": "Price Sentinel" }
        })
    }

    fn create_webhook_payload(&self, event: &NotificationEvent) -> serde_json::Value {
        let mut payload = json!({
            "embeds": [self.create_embed(event)]
        });

        if let Some(username) = &self.config.username {
            payload["username"] = json!(username);
        }

        payload
    }
}

#[async_trait]
impl NotifierPlugin for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord Notifier"
    }

    fn plugin_type(&self) -> &str {
        "discord"
    }

    fn description(&self) -> &str {
        "Sends price-drop alerts via Discord webhooks with embeds"
    }

    async fn notify(&self, event: &NotificationEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let payload = self.create_webhook_payload(event);

        let response = self.client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(NotificationResult::delivered(format!(
                "discord-{}",
                chrono::Utc::now().timestamp()
            )))
        } else {
            Ok(NotificationResult::failed(format!("webhook returned HTTP {}", status)))
        }
    }
}
