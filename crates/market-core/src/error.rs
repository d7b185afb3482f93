//! Error types for the market data core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error for the binary and configuration paths.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Per-symbol fetch failures.
///
/// Cloneable so that a single failure can be reported in a snapshot result
/// and logged without giving up ownership.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("circuit open for source '{source_name}' (retry in {retry_in_secs}s)")]
    CircuitOpen {
        source_name: String,
        retry_in_secs: u64,
    },

    #[error("transient upstream failure: {0}")]
    Transient(String),

    #[error("upstream request timed out after {0}ms")]
    Timeout(u64),

    #[error("rate limited by provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("unexpected response format: {0}")]
    ResponseFormat(String),

    #[error("no valid bars for {symbol} ({rejected} rejected)")]
    NoValidBars { symbol: String, rejected: usize },

    #[error("batch deadline exceeded before the symbol resolved")]
    DeadlineExceeded,

    #[error("indicator computation failed: {0}")]
    Indicator(String),
}

impl FetchError {
    /// Whether a failed attempt may be repeated within the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transient(_) | FetchError::Timeout(_) | FetchError::RateLimited { .. }
        )
    }

    /// Whether this outcome counts as a failure against the upstream source.
    ///
    /// A missing symbol or an all-invalid series is an answer from a healthy
    /// upstream, not an outage. An unparseable response (an HTML error page,
    /// a truncated body) is treated as an outage but is not retried.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            FetchError::Transient(_)
                | FetchError::Timeout(_)
                | FetchError::RateLimited { .. }
                | FetchError::ResponseFormat(_)
        )
    }

    /// Short stable label used in structured logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::CircuitOpen { .. } => "circuit_open",
            FetchError::Transient(_) => "transient",
            FetchError::Timeout(_) => "timeout",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::SymbolNotFound(_) => "symbol_not_found",
            FetchError::ResponseFormat(_) => "response_format",
            FetchError::NoValidBars { .. } => "no_valid_bars",
            FetchError::DeadlineExceeded => "deadline_exceeded",
            FetchError::Indicator(_) => "indicator",
        }
    }
}

/// A bar that violates the OHLCV invariants.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("non-finite {0}")]
    NonFinite(&'static str),

    #[error("negative price")]
    NegativePrice,

    #[error("high<low")]
    HighBelowLow,

    #[error("high<max(open,close)")]
    HighBelowBody,

    #[error("low>min(open,close)")]
    LowAboveBody,

    #[error("volume<0")]
    NegativeVolume,

    #[error("duplicate date")]
    DuplicateDate,
}

impl ValidationError {
    /// The rejection reason as reported to callers and logs.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Cache tier errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type alias for top-level operations.
pub type MarketResult<T> = Result<T, MarketError>;
