use crate::config::SmtpConfig;
use crate::plugins::traits::{NotificationEvent, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// SMTP delivery of price-drop alerts. Port 465 uses implicit TLS,
/// other ports upgrade with STARTTLS unless `use_tls` is off.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    currency_symbol: String,
}

impl EmailNotifier {
    pub fn new(config: &SmtpConfig, currency_symbol: &str) -> Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = config
            .to_address
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid to address: {}", e)))?;

        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        let builder = if !config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        } else if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::Notify(format!("Invalid SMTP relay {}: {}", config.host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| AppError::Notify(format!("Invalid SMTP relay {}: {}", config.host, e)))?
        };

        let mailer = builder.port(config.port).credentials(credentials).build();

        Ok(Self {
            mailer,
            from,
            to,
            currency_symbol: currency_symbol.to_string(),
        })
    }

    fn format_subject(&self, event: &NotificationEvent) -> String {
        format!("🔔 Price Drop Alert: {} - {}{}", event.title, self.currency_symbol, event.price)
    }

    fn format_text_body(&self, event: &NotificationEvent) -> String {
        let mut text = String::new();

        text.push_str(&format!(
            "The price for '{}' has dropped to {}{}!\n",
            event.title, self.currency_symbol, event.price
        ));
        text.push_str(&format!("Your target: {}{}\n", self.currency_symbol, event.target_price));
        text.push_str(&format!("Checked at: {}\n\n", event.observed_at.format("%Y-%m-%d %H:%M:%S UTC")));
        text.push_str(&format!("Check it out here: {}\n", event.target_url));

        text
    }

    fn build_message(&self, event: &NotificationEvent) -> std::result::Result<Message, lettre::error::Error> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.format_subject(event))
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.format_text_body(event))
    }
}

#[async_trait]
impl NotifierPlugin for EmailNotifier {
    fn name(&self) -> &str {
        "Email Notifier"
    }

    fn plugin_type(&self) -> &str {
        "email"
    }

    fn description(&self) -> &str {
        "Sends price-drop alerts via authenticated SMTP"
    }

    async fn notify(&self, event: &NotificationEvent) -> std::result::Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        let email = self.build_message(event)?;

        match self.mailer.send(email).await {
            Ok(response) => {
                tracing::info!(to = %self.to, code = %response.code(), "Price drop email sent");
                Ok(NotificationResult::delivered(format!(
                    "email-{}",
                    chrono::Utc::now().timestamp()
                )))
            }
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}
