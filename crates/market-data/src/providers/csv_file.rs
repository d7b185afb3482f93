//! CSV file provider.
//!
//! Reads `{dir}/{SYMBOL}.csv` and returns the bars that fall inside the
//! requested period, measured back from the newest bar in the file.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use market_core::error::FetchError;
use market_core::traits::BarProvider;
use market_core::types::{Bar, Period};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Directory of per-symbol CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Load every bar from one file, unfiltered and unvalidated.
    fn load_file(symbol: &str, path: &Path) -> Result<Vec<Bar>, FetchError> {
        if !path.exists() {
            return Err(FetchError::SymbolNotFound(symbol.to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| FetchError::Transient(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord =
                result.map_err(|e| FetchError::ResponseFormat(format!("{}: {e}", path.display())))?;
            let timestamp = parse_timestamp(&record.date)?;
            bars.push(Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        Ok(bars)
    }
}

/// Keep bars within `period` of the newest bar.
fn within_period(bars: Vec<Bar>, period: Period) -> Vec<Bar> {
    let Some(newest) = bars.iter().map(|b| b.timestamp).max() else {
        return bars;
    };
    let cutoff = newest - Duration::days(period.as_days()).num_milliseconds();
    bars.into_iter().filter(|b| b.timestamp > cutoff).collect()
}

/// Parse the date formats commonly found in exported price files.
fn parse_timestamp(date_str: &str) -> Result<i64, FetchError> {
    const FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    // Unix time; assume milliseconds past 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(FetchError::ResponseFormat(format!("could not parse date: {date_str}")))
}

#[async_trait]
impl BarProvider for CsvProvider {
    async fn fetch_bars(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FetchError> {
        let path = self.path_for(symbol);
        let owned_symbol = symbol.to_string();
        let bars = tokio::task::spawn_blocking(move || Self::load_file(&owned_symbol, &path))
            .await
            .map_err(|e| FetchError::Transient(format!("CSV reader task failed: {e}")))??;

        let bars = within_period(bars, period);
        debug!(symbol, %period, bars = bars.len(), "Loaded CSV bars");
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
