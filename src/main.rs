use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use price_sentinel::config::LoggingConfig;
use price_sentinel::plugins::notifiers;
use price_sentinel::{AppConfig, MonitorTarget, NotificationStatus, PriceWatcher};

#[derive(Parser)]
#[command(name = "price-sentinel", version, about = "Watch a product page and alert when the price drops")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check immediately, then keep checking on an interval until Ctrl-C
    Watch {
        #[arg(long)]
        url: String,
        #[arg(long)]
        target_price: Decimal,
        /// Overrides scheduler.interval_secs
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Run a single check
    Check {
        #[arg(long)]
        url: String,
        #[arg(long)]
        target_price: Decimal,
    },
    /// Print the recorded price history
    History,
    /// Delete the recorded price history
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    let _guard = init_tracing(&config.logging)?;

    if config.metrics.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics available at http://{}/metrics", addr);
    }

    if let Command::Watch { interval_secs: Some(secs), .. } = &cli.command {
        config.scheduler.interval_secs = *secs;
    }

    let notifier = notifiers::from_config(&config.notifications)?;
    let watcher = PriceWatcher::new(&config, notifier)?;

    match cli.command {
        Command::Watch { url, target_price, .. } => {
            let target = MonitorTarget::new(url, target_price)?;
            info!("Starting Price Sentinel...");
            watcher.start_tracking(target).await?;

            tokio::signal::ctrl_c().await?;
            info!("Shutting down...");
            watcher.stop().await?;

            let job = watcher.job_info().await;
            info!(
                "Completed {} checks ({} succeeded, {} failed)",
                job.run_count, job.success_count, job.error_count
            );
        }
        Command::Check { url, target_price } => {
            let target = MonitorTarget::new(url, target_price)?;
            let report = watcher.check_now(&target).await?;

            println!("{}", report.title);
            println!("Current price: {}{}", config.notifications.currency_symbol, report.observation.price);
            println!("Target price:  {}{}", config.notifications.currency_symbol, target.target_price);
            match report.notification {
                NotificationStatus::NotTriggered => println!("Still above target."),
                NotificationStatus::Sent => println!("Price drop alert sent."),
                NotificationStatus::Suppressed => println!("Below target; alert suppressed by cooldown."),
                NotificationStatus::Failed { error } => println!("Below target, but the alert failed: {}", error),
            }
        }
        Command::History => {
            let history = watcher.history().await?;
            if history.is_empty() {
                println!("No price history recorded yet.");
            }
            for observation in history {
                println!("{}\t{}", observation.timestamp.to_rfc3339(), observation.price);
            }
        }
        Command::Reset => {
            watcher.reset_history().await?;
            println!("Price history cleared.");
        }
    }

    Ok(())
}

/// Stdout by default; a daily rolling file when a log directory is set.
/// The returned guard flushes the file writer on drop.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("price_sentinel=debug".parse()?);

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "price-sentinel.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}
