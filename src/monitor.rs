use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::alert_gate::{AlertGate, NotifyPolicy};
use crate::config::AppConfig;
use crate::extractor::Extractor;
use crate::history::HistorySeries;
use crate::models::{MonitorTarget, NotificationStatus, Observation, ProductSnapshot};
use crate::plugins::traits::{NotificationEvent, NotifierPlugin};
use crate::scraper::{PageFetcher, WebScraper};
use crate::utils::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub target_url: String,
    pub title: String,
    pub observation: Observation,
    pub notification: NotificationStatus,
    pub total_time_ms: u64,
}

/// Runs fetch, extract, persist and notify for one target, in that order.
pub struct PriceMonitor {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Extractor,
    history: Arc<HistorySeries>,
    policy: NotifyPolicy,
    gate: Mutex<AlertGate>,
    notify_timeout: Duration,
}

impl PriceMonitor {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Extractor,
        history: Arc<HistorySeries>,
        policy: NotifyPolicy,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            history,
            policy,
            gate: Mutex::new(AlertGate::new(policy)),
            notify_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let scraper = WebScraper::new(config.scraper.clone())?;
        let extractor = Extractor::from_config(&config.scraper)?;
        let history = Arc::new(HistorySeries::new(config.history.path.clone()));

        Ok(Self::new(
            Arc::new(scraper),
            extractor,
            history,
            NotifyPolicy::from_config(&config.notifications),
            config.notifications.timeout(),
        ))
    }

    pub fn history(&self) -> &Arc<HistorySeries> {
        &self.history
    }

    /// One full cycle. Fetch and extraction failures leave history untouched
    /// and skip notification; a failed dispatch is reported in the returned
    /// `CycleReport` and does not undo the stored observation.
    pub async fn run_cycle(&self, target: &MonitorTarget, notifier: &dyn NotifierPlugin) -> Result<CycleReport> {
        let start_time = Instant::now();
        counter!("sentinel_cycles_total").increment(1);

        let result = self.execute_cycle(target, notifier, start_time).await;

        if let Err(e) = &result {
            counter!("sentinel_cycle_failures_total", "kind" => e.kind()).increment(1);
            tracing::warn!(url = %target.source_url, kind = e.kind(), "Price check failed: {}", e);
            if e.is_extraction_failure() {
                tracing::debug!("Page layout may have changed or the request was served a bot check");
            }
        }

        result
    }

    async fn execute_cycle(
        &self,
        target: &MonitorTarget,
        notifier: &dyn NotifierPlugin,
        start_time: Instant,
    ) -> Result<CycleReport> {
        let page = self.fetcher.fetch(&target.source_url).await?;
        if page.final_url != page.url {
            tracing::debug!(status = page.status, "{} redirected to {}", page.url, page.final_url);
        }
        let snapshot = self.extractor.extract(&page.body)?;

        let observation = self.history.record(&target.source_url, snapshot.price).await?;
        gauge!("sentinel_last_price").set(snapshot.price.to_f64().unwrap_or_default());

        tracing::info!(
            "Checked '{}': current price {} (target {})",
            snapshot.title,
            snapshot.price,
            target.target_price
        );

        let notification = if target.is_triggered_by(snapshot.price) {
            self.dispatch(target, &snapshot, &observation, notifier).await
        } else {
            NotificationStatus::NotTriggered
        };
        counter!("sentinel_notifications_total", "outcome" => notification.as_label()).increment(1);

        Ok(CycleReport {
            target_url: target.source_url.clone(),
            title: snapshot.title,
            observation,
            notification,
            total_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    async fn dispatch(
        &self,
        target: &MonitorTarget,
        snapshot: &ProductSnapshot,
        observation: &Observation,
        notifier: &dyn NotifierPlugin,
    ) -> NotificationStatus {
        // Under a cooldown the gate is held across the send so concurrent
        // cycles see each other's alerts; every-cycle sends never wait on it
        let mut gate = match self.policy {
            NotifyPolicy::EveryCycle => None,
            NotifyPolicy::Cooldown(_) => {
                let gate = self.gate.lock().await;
                if !gate.should_alert(observation.timestamp) {
                    tracing::info!("Alert for '{}' suppressed by cooldown", snapshot.title);
                    return NotificationStatus::Suppressed;
                }
                Some(gate)
            }
        };

        let event = NotificationEvent {
            title: snapshot.title.clone(),
            price: snapshot.price,
            target_url: target.source_url.clone(),
            target_price: target.target_price,
            observed_at: observation.timestamp,
        };

        match tokio::time::timeout(self.notify_timeout, notifier.notify(&event)).await {
            Ok(Ok(result)) if result.success => {
                if let Some(gate) = gate.as_mut() {
                    gate.record_alert(observation.timestamp);
                }
                tracing::info!(notifier = notifier.plugin_type(), "Price drop alert sent for '{}'", snapshot.title);
                NotificationStatus::Sent
            }
            Ok(Ok(result)) => {
                let error = result
                    .error
                    .unwrap_or_else(|| format!("{} reported failure", notifier.name()));
                tracing::error!(notifier = notifier.plugin_type(), "Price drop alert failed: {}", error);
                NotificationStatus::Failed { error }
            }
            Ok(Err(e)) => {
                tracing::error!(notifier = notifier.plugin_type(), "Price drop alert failed: {}", e);
                NotificationStatus::Failed { error: e.to_string() }
            }
            Err(_) => {
                let error = format!("{} timed out after {:?}", notifier.name(), self.notify_timeout);
                tracing::error!(notifier = notifier.plugin_type(), "{}", error);
                NotificationStatus::Failed { error }
            }
        }
    }
}
