use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;

use crate::config::ScraperConfig;
use crate::models::ProductSnapshot;
use crate::utils::error::{AppError, Result};

/// Reads the product title and current price out of page markup.
///
/// Price text is normalized by dropping currency symbols, thousands
/// separators and whitespace, then keeping only the integer portion before
/// the first `.`. Fractional digits are discarded, not rounded, so
/// `₹999.50` reads as `999`.
pub struct Extractor {
    title_selector: Selector,
    title_selector_src: String,
    price_selector: Selector,
    price_selector_src: String,
    currency_regex: Regex,
    separator_regex: Regex,
}

impl Extractor {
    pub fn new(title_selector: &str, price_selector: &str) -> Result<Self> {
        Ok(Self {
            title_selector: parse_selector(title_selector)?,
            title_selector_src: title_selector.to_string(),
            price_selector: parse_selector(price_selector)?,
            price_selector_src: price_selector.to_string(),
            // Longer symbols first so "US$" is not left as "US"
            currency_regex: Regex::new(r"USD\$|US\$|[\$£€¥₹]")
                .map_err(|e| AppError::Internal(e.to_string()))?,
            separator_regex: Regex::new(r"[,\s]").map_err(|e| AppError::Internal(e.to_string()))?,
        })
    }

    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Self::new(&config.title_selector, &config.price_selector)
    }

    pub fn extract(&self, html: &str) -> Result<ProductSnapshot> {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title_selector)
            .next()
            .map(|element| collapse_whitespace(&element_text(&element)))
            .ok_or_else(|| AppError::TitleNotFound {
                selector: self.title_selector_src.clone(),
            })?;

        let price_text = document
            .select(&self.price_selector)
            .next()
            .map(|element| element_text(&element))
            .ok_or_else(|| AppError::PriceNotFound {
                selector: self.price_selector_src.clone(),
            })?;

        let price = self.normalize_price(&price_text)?;

        Ok(ProductSnapshot { title, price })
    }

    pub fn normalize_price(&self, raw: &str) -> Result<Decimal> {
        let without_symbols = self.currency_regex.replace_all(raw, "");
        let compact = self.separator_regex.replace_all(&without_symbols, "");
        let whole = compact.split('.').next().unwrap_or_default();

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::PriceFormat { raw: raw.trim().to_string() });
        }

        Decimal::from_str(whole).map_err(|_| AppError::PriceFormat { raw: raw.trim().to_string() })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
