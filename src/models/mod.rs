use serde::{Deserialize, Serialize};

pub mod observation;
pub mod target;

// Re-exports for convenience
pub use observation::*;
pub use target::*;

/// What happened to the alert for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum NotificationStatus {
    /// Observed price stayed above the target.
    NotTriggered,
    Sent,
    /// Price was at or below target but the cooldown window was still open.
    Suppressed,
    Failed { error: String },
}

impl NotificationStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            NotificationStatus::NotTriggered => "not_triggered",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Suppressed => "suppressed",
            NotificationStatus::Failed { .. } => "failed",
        }
    }
}
