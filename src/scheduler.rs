use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::models::MonitorTarget;
use crate::monitor::{CycleReport, PriceMonitor};
use crate::plugins::traits::NotifierPlugin;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub status: JobStatus,
    pub interval_secs: Option<u64>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub manual_runs: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

impl Default for JobInfo {
    fn default() -> Self {
        Self {
            status: JobStatus::Idle,
            interval_secs: None,
            last_run: None,
            run_count: 0,
            success_count: 0,
            error_count: 0,
            manual_runs: 0,
            last_error: None,
        }
    }
}

struct RunningLoop {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Drives one periodic loop of monitor cycles plus any number of manual
/// cycles against the same monitor.
pub struct PriceScheduler {
    monitor: Arc<PriceMonitor>,
    job: Arc<RwLock<JobInfo>>,
    running: Mutex<Option<RunningLoop>>,
}

impl PriceScheduler {
    pub fn new(monitor: Arc<PriceMonitor>) -> Self {
        Self {
            monitor,
            job: Arc::new(RwLock::new(JobInfo::default())),
            running: Mutex::new(None),
        }
    }

    /// Runs a cycle right away, then once per `interval` until `stop`.
    pub async fn start(
        &self,
        target: MonitorTarget,
        notifier: Arc<dyn NotifierPlugin>,
        interval: Duration,
    ) -> Result<()> {
        if interval.is_zero() {
            return Err(AppError::Validation("Check interval must be greater than zero".to_string()));
        }

        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return Err(AppError::Scheduler("A price check loop is already running".to_string()));
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let monitor = Arc::clone(&self.monitor);
        let job = Arc::clone(&self.job);

        {
            let mut job = job.write().await;
            job.status = JobStatus::Running;
            job.interval_secs = Some(interval.as_secs());
        }

        tracing::info!(
            "Tracking {} (target {}) every {:?}",
            target.source_url,
            target.target_price,
            interval
        );

        let task = tokio::spawn(Self::run_loop(monitor, job, target, notifier, interval, cancel_rx));
        *running = Some(RunningLoop { cancel, task });

        Ok(())
    }

    async fn run_loop(
        monitor: Arc<PriceMonitor>,
        job: Arc<RwLock<JobInfo>>,
        target: MonitorTarget,
        notifier: Arc<dyn NotifierPlugin>,
        interval: Duration,
        mut cancel: watch::Receiver<bool>,
    ) {
        // The first cycle runs before any stop request is looked at
        let outcome = monitor.run_cycle(&target, notifier.as_ref()).await;
        Self::record_outcome(&job, &outcome, false).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => break,
                _ = ticker.tick() => {}
            }

            // Outside the select so a stop request never cuts a cycle short
            let outcome = monitor.run_cycle(&target, notifier.as_ref()).await;
            Self::record_outcome(&job, &outcome, false).await;
        }

        tracing::debug!("Price check loop for {} exited", target.source_url);
    }

    /// A single cycle outside the periodic cadence. Safe to call while the
    /// loop is running.
    pub async fn trigger_once(
        &self,
        target: &MonitorTarget,
        notifier: &dyn NotifierPlugin,
    ) -> Result<CycleReport> {
        tracing::info!("Running manual price check for {}", target.source_url);

        let outcome = self.monitor.run_cycle(target, notifier).await;
        Self::record_outcome(&self.job, &outcome, true).await;
        outcome
    }

    /// Cancels the loop and waits for any in-flight cycle to finish.
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        // The receiver is gone if the task already exited
        let _ = running.cancel.send(true);
        let joined = running.task.await;

        self.job.write().await.status = JobStatus::Stopped;

        joined.map_err(|e| AppError::Scheduler(format!("Price check loop terminated abnormally: {}", e)))?;
        tracing::info!("Price check loop stopped");
        Ok(())
    }

    pub async fn job_info(&self) -> JobInfo {
        self.job.read().await.clone()
    }

    async fn record_outcome(job: &RwLock<JobInfo>, outcome: &Result<CycleReport>, manual: bool) {
        let mut job = job.write().await;
        job.last_run = Some(Utc::now());
        job.run_count += 1;
        if manual {
            job.manual_runs += 1;
        }

        match outcome {
            Ok(_) => {
                job.success_count += 1;
                job.last_error = None;
            }
            Err(e) => {
                job.error_count += 1;
                job.last_error = Some(e.to_string());
            }
        }
    }
}
