use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Product title not found ({selector}); possibly blocked or wrong page structure")]
    TitleNotFound { selector: String },

    #[error("Price element not found: {selector}")]
    PriceNotFound { selector: String },

    #[error("Price format error: cannot read a number from {raw:?}")]
    PriceFormat { raw: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable label for logs and metric dimensions.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Network(_) => "network",
            AppError::TitleNotFound { .. } => "title_not_found",
            AppError::PriceNotFound { .. } => "price_not_found",
            AppError::PriceFormat { .. } => "price_format",
            AppError::Storage(_) => "storage",
            AppError::Notify(_) => "notify",
            AppError::Config(_) => "config",
            AppError::Validation(_) => "validation",
            AppError::Scheduler(_) => "scheduler",
            AppError::Internal(_) => "internal",
        }
    }

    /// True for failures caused by the page not matching the expected markup.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            AppError::TitleNotFound { .. } | AppError::PriceNotFound { .. } | AppError::PriceFormat { .. }
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Network(format!("request timed out: {}", err))
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
