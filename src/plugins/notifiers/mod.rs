// Notifier plugin implementations
pub mod email;
pub mod discord;
pub mod log;

pub use email::EmailNotifier;
pub use discord::DiscordNotifier;
pub use log::LogNotifier;

use std::sync::Arc;

use crate::config::NotificationsConfig;
use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::Result;

/// Picks the configured transport: SMTP first, then Discord, else the log.
pub fn from_config(config: &NotificationsConfig) -> Result<Arc<dyn NotifierPlugin>> {
    if let Some(smtp) = &config.smtp {
        return Ok(Arc::new(EmailNotifier::new(smtp, &config.currency_symbol)?));
    }

    if let Some(discord) = &config.discord {
        return Ok(Arc::new(DiscordNotifier::new(discord.clone(), &config.currency_symbol)));
    }

    tracing::warn!("No notification transport configured; alerts will only be logged");
    Ok(Arc::new(LogNotifier::new()))
}
