pub mod alert_gate;
pub mod config;
pub mod extractor;
pub mod history;
pub mod models;
pub mod monitor;
pub mod plugins;
pub mod scheduler;
pub mod scraper;
pub mod utils;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::{MonitorTarget, NotificationStatus, Observation};
pub use monitor::{CycleReport, PriceMonitor};
pub use scheduler::{JobInfo, JobStatus, PriceScheduler};
pub use utils::error::AppError;
pub use watcher::PriceWatcher;

pub type Result<T> = std::result::Result<T, AppError>;
