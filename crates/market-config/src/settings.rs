//! Configuration structures.

use market_cache::{CacheConfig, MarketHoursTtl, MetricsConfig};
use market_core::error::MarketError;
use market_data::{CircuitBreakerConfig, FetcherConfig, ValidationConfig, YahooConfig};
use market_indicators::IndicatorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "market-snapshot".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Upstream provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Yahoo,
    Csv,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Yahoo => f.write_str("yahoo"),
            ProviderKind::Csv => f.write_str("csv"),
        }
    }
}

/// Upstream provider selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub primary: ProviderKind,
    /// Retried for symbols the primary could not serve
    pub fallback: Option<ProviderKind>,
    pub yahoo: YahooConfig,
    /// Directory holding `{SYMBOL}.csv` files
    pub csv_dir: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            primary: ProviderKind::Yahoo,
            fallback: Some(ProviderKind::Csv),
            yahoo: YahooConfig::default(),
            csv_dir: PathBuf::from("data"),
        }
    }
}

impl AppConfig {
    /// Reject settings the components cannot run with.
    ///
    /// Every problem is reported, not just the first.
    pub fn validate(&self) -> Result<(), MarketError> {
        let mut problems = Vec::new();
        let mut check = |ok: bool, message: &str| {
            if !ok {
                problems.push(message.to_string());
            }
        };

        let f = &self.fetcher;
        check(f.max_concurrency > 0, "fetcher.max_concurrency must be at least 1");
        check(f.max_delay_ms >= f.base_delay_ms, "fetcher.max_delay_ms must not be below base_delay_ms");
        check(f.request_timeout_ms > 0, "fetcher.request_timeout_ms must be positive");
        check(f.batch_deadline_secs > 0, "fetcher.batch_deadline_secs must be positive");

        let cb = &self.circuit_breaker;
        check(cb.failure_threshold > 0, "circuit_breaker.failure_threshold must be at least 1");
        check(cb.success_threshold > 0, "circuit_breaker.success_threshold must be at least 1");

        let c = &self.cache;
        check(c.l1_capacity > 0, "cache.l1_capacity must be at least 1");
        check(c.l1_ttl_secs > 0, "cache.l1_ttl_secs must be positive");
        check(!c.key_prefix.is_empty(), "cache.key_prefix must not be empty");

        let m = &self.metrics;
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        check(
            unit(m.l1_floor) && unit(m.l2_floor) && unit(m.overall_floor) && unit(m.namespace_floor),
            "metrics floors must lie in [0, 1]",
        );

        let v = &self.validation;
        check(
            v.etf_min_volume >= 0.0 && v.equity_min_volume >= 0.0,
            "validation volume floors must not be negative",
        );

        let i = &self.indicators;
        check(i.cmf_period > 0, "indicators.cmf_period must be at least 1");
        check(i.momentum_lookback > 0, "indicators.momentum_lookback must be at least 1");
        check(!i.benchmark.trim().is_empty(), "indicators.benchmark must not be empty");

        check(
            self.provider.fallback != Some(self.provider.primary),
            "provider.fallback must differ from provider.primary",
        );

        if let Err(e) = MarketHoursTtl::from_config(&c.market_hours) {
            problems.push(e.to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(MarketError::Config(problems.join("; ")))
        }
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, MarketError> {
        toml::to_string_pretty(self).map_err(|e| MarketError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = AppConfig::default();
        config.fetcher.max_concurrency = 0;
        config.indicators.cmf_period = 0;
        config.cache.market_hours.open = "17:00".into();

        let err = config.validate().unwrap_err().to_string();

        assert!(err.contains("max_concurrency"));
        assert!(err.contains("cmf_period"));
        assert!(err.contains("must be before close"));
    }

    #[test]
    fn test_same_fallback_rejected() {
        let mut config = AppConfig::default();
        config.provider.fallback = Some(ProviderKind::Yahoo);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
