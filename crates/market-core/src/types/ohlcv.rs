//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Period;

/// Compact OHLCV bar.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Create a bar stamped at midnight UTC of the given date.
    pub fn on_date(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        Self::new(timestamp, open, high, low, close, volume)
    }

    /// Upper edge of the candle body.
    #[inline]
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Lower edge of the candle body.
    #[inline]
    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Calendar date (UTC) of the bar, used for duplicate detection and
    /// series alignment.
    pub fn date(&self) -> NaiveDate {
        self.datetime().date_naive()
    }
}

/// Ordered bars for one instrument: time-ascending, no duplicate dates.
///
/// Constructed by the validator; downstream consumers only borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    /// Symbol identifier
    pub symbol: String,
    /// Lookback window the bars were requested for
    pub period: Period,
    bars: Vec<Bar>,
}

impl SymbolSeries {
    /// Wrap bars that are already sorted and de-duplicated.
    pub fn new(symbol: impl Into<String>, period: Period, bars: Vec<Bar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].date() < w[1].date()));
        Self {
            symbol: symbol.into(),
            period,
            bars,
        }
    }

    /// Get the number of bars.
    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Check if the series is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Get all bars as a slice.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Get the first bar.
    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    /// Get the last bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Extract close prices as a vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Extract high prices as a vector.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    /// Extract low prices as a vector.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Extract volumes as a vector.
    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Get an iterator over the bars.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}
