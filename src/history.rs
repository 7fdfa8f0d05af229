use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::models::Observation;
use crate::utils::error::{AppError, Result};

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const PRICE_COLUMN: &str = "Price";
pub const URL_COLUMN: &str = "Url";

/// Append-only price series for one target, stored as a CSV file.
///
/// Every file operation runs under one async mutex, so concurrent cycles
/// sharing an instance never interleave partial rows. The header line is
/// written by whichever append finds the file missing or empty. Each row
/// carries the product URL, and a file only ever holds one product: an
/// append for a different URL is refused until the history is reset.
pub struct HistorySeries {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistorySeries {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamps `price` with the current time and appends it. The timestamp is
    /// taken under the lock, so file order matches timestamp order.
    pub async fn record(&self, source_url: &str, price: Decimal) -> Result<Observation> {
        let _guard = self.lock.lock().await;

        let observation = Observation::now(price);
        self.append_locked(source_url, &observation).await?;
        Ok(observation)
    }

    pub async fn append(&self, source_url: &str, observation: &Observation) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.append_locked(source_url, observation).await
    }

    async fn append_locked(&self, source_url: &str, observation: &Observation) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.storage_error("create directory for", e))?;
            }
        }

        let existing = self.read_text().await?;

        let mut chunk = String::new();
        // A last row without its newline would otherwise swallow the new one
        if !existing.is_empty() && !existing.ends_with('\n') {
            chunk.push('\n');
        }

        let layout = if existing.trim().is_empty() {
            let layout = Layout::standard();
            chunk.push_str(&layout.header());
            layout
        } else {
            let layout = Layout::from_text(&existing).map_err(|message| self.format_error(message))?;
            if let Some(owner) = layout.owner(&existing) {
                if owner != source_url {
                    return Err(AppError::Storage(format!(
                        "{} holds the price history of {}; reset it before recording {}",
                        self.path.display(),
                        owner,
                        source_url
                    )));
                }
            }
            layout
        };
        chunk.push_str(&layout.row(observation, source_url));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.storage_error("open", e))?;
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| self.storage_error("append to", e))?;
        file.flush().await.map_err(|e| self.storage_error("flush", e))?;

        tracing::debug!(path = %self.path.display(), price = %observation.price, "Appended observation");
        Ok(())
    }

    /// Full series in append order. A missing or empty file is an empty series.
    pub async fn read_all(&self) -> Result<Vec<Observation>> {
        let _guard = self.lock.lock().await;

        let text = self.read_text().await?;
        parse_history(&text).map_err(|message| self.format_error(message))
    }

    /// URL of the product this file records, if it has any rows that name one.
    pub async fn owner(&self) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;

        let text = self.read_text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let layout = Layout::from_text(&text).map_err(|message| self.format_error(message))?;
        Ok(layout.owner(&text))
    }

    /// Deletes all history. Succeeds when there is nothing to delete.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.lock.lock().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Price history reset");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error("remove", e)),
        }
    }

    async fn read_text(&self) -> Result<String> {
        match fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.storage_error("read", e)),
        }
    }

    fn storage_error(&self, action: &str, err: std::io::Error) -> AppError {
        AppError::Storage(format!("Failed to {} {}: {}", action, self.path.display(), err))
    }

    fn format_error(&self, message: String) -> AppError {
        AppError::Storage(format!("{}: {}", self.path.display(), message))
    }
}

/// Column positions read from a header line. `Url` is optional so files
/// written before it existed still load.
struct Layout {
    columns: Vec<String>,
    ts_idx: usize,
    price_idx: usize,
    url_idx: Option<usize>,
}

impl Layout {
    fn standard() -> Self {
        Self {
            columns: vec![TIMESTAMP_COLUMN.to_string(), PRICE_COLUMN.to_string(), URL_COLUMN.to_string()],
            ts_idx: 0,
            price_idx: 1,
            url_idx: Some(2),
        }
    }

    fn from_header(header: &str) -> std::result::Result<Self, String> {
        let columns: Vec<String> = split_record(header)
            .into_iter()
            .map(|c| c.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let position = |name: &str| columns.iter().position(|c| c == name);

        let (Some(ts_idx), Some(price_idx)) = (position(TIMESTAMP_COLUMN), position(PRICE_COLUMN)) else {
            return Err(format!(
                "missing expected columns {}, {} (found: {})",
                TIMESTAMP_COLUMN,
                PRICE_COLUMN,
                columns.join(", ")
            ));
        };
        let url_idx = position(URL_COLUMN);

        Ok(Self { columns, ts_idx, price_idx, url_idx })
    }

    fn from_text(text: &str) -> std::result::Result<Self, String> {
        match text.lines().find(|line| !line.trim().is_empty()) {
            Some(header) => Self::from_header(header),
            None => Ok(Self::standard()),
        }
    }

    fn header(&self) -> String {
        let mut line = self.columns.iter().map(|c| quote_field(c)).collect::<Vec<_>>().join(",");
        line.push('\n');
        line
    }

    /// Writes the row in this file's own column order.
    fn row(&self, observation: &Observation, source_url: &str) -> String {
        let timestamp = observation.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let price = observation.price.to_string();

        let mut line = (0..self.columns.len())
            .map(|idx| {
                if idx == self.ts_idx {
                    quote_field(&timestamp)
                } else if idx == self.price_idx {
                    quote_field(&price)
                } else if Some(idx) == self.url_idx {
                    quote_field(source_url)
                } else {
                    String::new()
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }

    /// The URL on the last data row, when the file has a `Url` column.
    fn owner(&self, text: &str) -> Option<String> {
        let url_idx = self.url_idx?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .skip(1)
            .last()
            .and_then(|line| split_record(line).into_iter().nth(url_idx))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }
}

fn parse_history(text: &str) -> std::result::Result<Vec<Observation>, String> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let layout = Layout::from_header(header)?;

    let mut observations = Vec::new();
    for (idx, line) in lines {
        let fields = split_record(line);
        let line_no = idx + 1;

        let raw_ts = fields
            .get(layout.ts_idx)
            .map(|f| f.trim())
            .ok_or_else(|| format!("line {}: missing {} value", line_no, TIMESTAMP_COLUMN))?;
        let raw_price = fields
            .get(layout.price_idx)
            .map(|f| f.trim())
            .ok_or_else(|| format!("line {}: missing {} value", line_no, PRICE_COLUMN))?;

        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| format!("line {}: invalid timestamp {:?}", line_no, raw_ts))?;
        let price = Decimal::from_str(raw_price)
            .map_err(|_| format!("line {}: invalid price {:?}", line_no, raw_price))?;

        observations.push(Observation::new(timestamp, price));
    }

    Ok(observations)
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS[.ffffff]` read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Splits one CSV line, honouring double-quoted fields.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    fields.push(field);

    fields
}
