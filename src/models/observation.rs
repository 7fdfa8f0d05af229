use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One recorded price sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }

    pub fn now(price: Decimal) -> Self {
        Self::new(Utc::now(), price)
    }
}

/// Title and price read from a product page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductSnapshot {
    pub title: String,
    pub price: Decimal,
}
