use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::utils::error::Result;

/// The product page being watched and the price that should trigger an alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct MonitorTarget {
    #[validate(url)]
    pub source_url: String,
    #[validate(custom(function = "validate_target_price"))]
    pub target_price: Decimal,
}

impl MonitorTarget {
    pub fn new(source_url: impl Into<String>, target_price: Decimal) -> Result<Self> {
        let target = Self {
            source_url: source_url.into().trim().to_string(),
            target_price,
        };
        target.validate()?;
        Ok(target)
    }

    /// Alerts fire when the observed price is at or below the target.
    pub fn is_triggered_by(&self, price: Decimal) -> bool {
        price <= self.target_price
    }
}

fn validate_target_price(price: &Decimal) -> std::result::Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("negative_target_price"));
    }
    Ok(())
}
