use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::config::{NotificationsConfig, NotifyPolicyMode};

/// When a triggered cycle may actually dispatch an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// Alert on every cycle that observes a price at or below target.
    #[default]
    EveryCycle,
    /// After a delivered alert, stay quiet for this long.
    Cooldown(Duration),
}

impl NotifyPolicy {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        match config.policy {
            NotifyPolicyMode::EveryCycle => NotifyPolicy::EveryCycle,
            NotifyPolicyMode::Cooldown => NotifyPolicy::Cooldown(Duration::from_secs(config.cooldown_secs)),
        }
    }
}

/// Cooldown gate in front of the notifier.
/// - First alert always allowed.
/// - Inside cooldown, alerts are suppressed.
/// - State is updated explicitly via `record_alert` after a successful send.
#[derive(Debug, Clone, Default)]
pub struct AlertGate {
    policy: NotifyPolicy,
    last_alert_ts: Option<DateTime<Utc>>,
}

impl AlertGate {
    pub fn new(policy: NotifyPolicy) -> Self {
        Self {
            policy,
            last_alert_ts: None,
        }
    }

    /// Check if we may alert at `now`. Does NOT mutate state.
    pub fn should_alert(&self, now: DateTime<Utc>) -> bool {
        match (self.policy, self.last_alert_ts) {
            (NotifyPolicy::EveryCycle, _) => true,
            (NotifyPolicy::Cooldown(_), None) => true,
            // A clock that moved backwards keeps the gate closed
            (NotifyPolicy::Cooldown(window), Some(ts)) => now
                .signed_duration_since(ts)
                .to_std()
                .map(|elapsed| elapsed >= window)
                .unwrap_or(false),
        }
    }

    pub fn record_alert(&mut self, now: DateTime<Utc>) {
        self.last_alert_ts = Some(now);
    }
}
