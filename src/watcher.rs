use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::models::{MonitorTarget, Observation};
use crate::monitor::{CycleReport, PriceMonitor};
use crate::plugins::traits::NotifierPlugin;
use crate::scheduler::{JobInfo, PriceScheduler};
use crate::utils::error::{AppError, Result};

/// Control surface for a running instance: start tracking, check now,
/// read history, reset history.
///
/// One watcher follows one product. While a loop is tracking a target,
/// manual checks for any other URL are refused, and a history file that
/// already belongs to another URL must be reset before it is reused.
pub struct PriceWatcher {
    monitor: Arc<PriceMonitor>,
    scheduler: PriceScheduler,
    notifier: Arc<dyn NotifierPlugin>,
    interval: Duration,
    tracked: RwLock<Option<MonitorTarget>>,
}

impl PriceWatcher {
    pub fn new(config: &AppConfig, notifier: Arc<dyn NotifierPlugin>) -> Result<Self> {
        config.validate()?;
        let monitor = Arc::new(PriceMonitor::from_config(config)?);
        Ok(Self::from_parts(monitor, notifier, config.scheduler.interval()))
    }

    pub fn from_parts(monitor: Arc<PriceMonitor>, notifier: Arc<dyn NotifierPlugin>, interval: Duration) -> Self {
        Self {
            scheduler: PriceScheduler::new(Arc::clone(&monitor)),
            monitor,
            notifier,
            interval,
            tracked: RwLock::new(None),
        }
    }

    /// Replaces any loop already running with one for `target`.
    pub async fn start_tracking(&self, target: MonitorTarget) -> Result<()> {
        let mut tracked = self.tracked.write().await;
        self.scheduler.stop().await?;
        *tracked = None;

        self.ensure_owner(&target).await?;
        self.scheduler
            .start(target.clone(), Arc::clone(&self.notifier), self.interval)
            .await?;
        *tracked = Some(target);
        Ok(())
    }

    pub async fn check_now(&self, target: &MonitorTarget) -> Result<CycleReport> {
        {
            let tracked = self.tracked.read().await;
            if let Some(current) = tracked.as_ref().filter(|t| t.source_url != target.source_url) {
                return Err(AppError::Validation(format!(
                    "Already tracking {}; stop tracking before checking {}",
                    current.source_url, target.source_url
                )));
            }
        }

        self.ensure_owner(target).await?;
        self.scheduler.trigger_once(target, self.notifier.as_ref()).await
    }

    pub async fn tracked(&self) -> Option<MonitorTarget> {
        self.tracked.read().await.clone()
    }

    async fn ensure_owner(&self, target: &MonitorTarget) -> Result<()> {
        let history = self.monitor.history();
        match history.owner().await? {
            Some(owner) if owner != target.source_url => Err(AppError::Validation(format!(
                "{} already holds the price history of {}; reset it before tracking {}",
                history.path().display(),
                owner,
                target.source_url
            ))),
            _ => Ok(()),
        }
    }

    pub async fn history(&self) -> Result<Vec<Observation>> {
        self.monitor.history().read_all().await
    }

    pub async fn reset_history(&self) -> Result<()> {
        self.monitor.history().reset().await?;
        tracing::info!("Price history cleared");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut tracked = self.tracked.write().await;
        self.scheduler.stop().await?;
        *tracked = None;
        Ok(())
    }

    pub async fn job_info(&self) -> JobInfo {
        self.scheduler.job_info().await
    }
}
