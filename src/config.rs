use config::{Config, ConfigError, Environment, File};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub history: HistoryConfig,
    pub notifications: NotificationsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Seconds before a page fetch is abandoned.
    pub request_timeout: u64,
    pub title_selector: String,
    pub price_selector: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotifyPolicyMode {
    #[default]
    EveryCycle,
    Cooldown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Seconds a single dispatch may take before it is reported as failed.
    pub timeout_secs: u64,
    pub policy: NotifyPolicyMode,
    pub cooldown_secs: u64,
    pub currency_symbol: String,
    pub smtp: Option<SmtpConfig>,
    pub discord: Option<DiscordConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// When set, logs go to a daily rolling file in this directory instead of stdout.
    pub directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig {
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                             (KHTML, like Gecko) Chrome/90.0.4430.85 Safari/537.36"
                    .to_string(),
                request_timeout: 10,
                title_selector: "#productTitle".to_string(),
                price_selector: "span.a-price-whole".to_string(),
            },
            scheduler: SchedulerConfig { interval_secs: 3600 },
            history: HistoryConfig {
                path: PathBuf::from("data/price_history.csv"),
            },
            notifications: NotificationsConfig {
                timeout_secs: 30,
                policy: NotifyPolicyMode::EveryCycle,
                cooldown_secs: 0,
                currency_symbol: "₹".to_string(),
                smtp: None,
                discord: None,
            },
            metrics: MetricsConfig {
                enabled: false,
                port: 9001,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl NotificationsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Built-in defaults so a bare checkout runs without any files
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // e.g. SENTINEL_SCHEDULER__INTERVAL_SECS=600
            .add_source(
                Environment::with_prefix("SENTINEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.notifications.smtp.is_none() {
            config.notifications.smtp = SmtpConfig::from_legacy_env();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.request_timeout == 0 {
            return Err(ConfigError::Message("Scraper request_timeout must be greater than 0".into()));
        }

        if self.scraper.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scraper user_agent must not be empty".into()));
        }

        for (name, selector) in [
            ("title_selector", &self.scraper.title_selector),
            ("price_selector", &self.scraper.price_selector),
        ] {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!("Invalid CSS selector in scraper.{}: {}", name, selector)));
            }
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler interval_secs must be greater than 0".into()));
        }

        if self.history.path.as_os_str().is_empty() {
            return Err(ConfigError::Message("History path must not be empty".into()));
        }

        if self.notifications.timeout_secs == 0 {
            return Err(ConfigError::Message("Notification timeout_secs must be greater than 0".into()));
        }

        if self.notifications.policy == NotifyPolicyMode::Cooldown && self.notifications.cooldown_secs == 0 {
            return Err(ConfigError::Message("Cooldown policy requires cooldown_secs greater than 0".into()));
        }

        if let Some(smtp) = &self.notifications.smtp {
            if smtp.port == 0 {
                return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
            }
            if smtp.host.is_empty() || smtp.to_address.is_empty() {
                return Err(ConfigError::Message("SMTP host and to_address are required".into()));
            }
        }

        if let Some(discord) = &self.notifications.discord {
            if url::Url::parse(&discord.webhook_url).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL".into()));
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}

impl SmtpConfig {
    /// Builds an SMTP section from `EMAIL_ADDRESS`, `EMAIL_PASSWORD` and
    /// `RECEIVER_EMAIL`, relaying through Gmail over implicit TLS.
    pub fn from_legacy_env() -> Option<Self> {
        let address = env::var("EMAIL_ADDRESS").ok()?;
        let password = env::var("EMAIL_PASSWORD").ok()?;
        let receiver = env::var("RECEIVER_EMAIL").ok()?;

        Some(SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            username: address.clone(),
            password,
            from_address: address,
            from_name: "Price Sentinel".to_string(),
            to_address: receiver,
            use_tls: true,
        })
    }
}
