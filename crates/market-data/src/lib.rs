//! Market data acquisition.
//!
//! Upstream provider adapters, bar validation, the per-source circuit
//! breaker and the rate-limited concurrent fetcher.

pub mod circuit_breaker;
pub mod fetcher;
pub mod providers;
pub mod validator;

pub use circuit_breaker::{BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState, CircuitStatus};
pub use fetcher::{FetcherConfig, RateLimitedFetcher, SymbolFetch};
pub use providers::{CsvProvider, YahooConfig, YahooProvider};
pub use validator::{
    validate_bar, BarValidator, QualityWarning, RejectedBar, ValidatedSeries, ValidationConfig, ValidationReport,
};
