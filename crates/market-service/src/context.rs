//! Process-wide components, constructed once and shared.

use crate::snapshot::SymbolSnapshot;
use market_cache::{CacheManager, CacheMetrics};
use market_config::{AppConfig, ProviderConfig, ProviderKind};
use market_core::error::MarketError;
use market_core::traits::BarProvider;
use market_data::{BarValidator, CircuitBreaker, CsvProvider, RateLimitedFetcher, YahooProvider};
use market_indicators::IndicatorEngine;
use std::sync::Arc;
use tracing::info;

/// Everything a snapshot request touches: fetchers with their breakers,
/// the cache and its metrics, and the indicator engine.
///
/// Replaces process-wide singletons; tests build a fresh context each.
pub struct MarketContext {
    primary: RateLimitedFetcher,
    fallback: Option<RateLimitedFetcher>,
    cache: CacheManager<SymbolSnapshot>,
    engine: IndicatorEngine,
    benchmark: String,
}

impl MarketContext {
    pub fn new(
        primary: RateLimitedFetcher,
        fallback: Option<RateLimitedFetcher>,
        cache: CacheManager<SymbolSnapshot>,
        engine: IndicatorEngine,
        benchmark: impl Into<String>,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache,
            engine,
            benchmark: benchmark.into().trim().to_ascii_uppercase(),
        }
    }

    /// Build every component from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, MarketError> {
        config.validate()?;

        let validator = Arc::new(BarValidator::new(config.validation.clone()));
        let primary = build_fetcher(config.provider.primary, config, &validator)?;
        let fallback = config
            .provider
            .fallback
            .map(|kind| build_fetcher(kind, config, &validator))
            .transpose()?;

        let metrics = Arc::new(CacheMetrics::new(config.metrics.clone()));
        let store = config.cache.store.open()?;
        let cache = CacheManager::new(&config.cache, store, metrics)?;
        let engine = IndicatorEngine::new(&config.indicators);

        info!(
            primary = primary.source(),
            fallback = fallback.as_ref().map(|f| f.source()),
            store = cache.l2_name(),
            benchmark = %config.indicators.benchmark,
            "Market context ready"
        );

        Ok(Self::new(primary, fallback, cache, engine, config.indicators.benchmark.clone()))
    }

    pub fn primary(&self) -> &RateLimitedFetcher {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&RateLimitedFetcher> {
        self.fallback.as_ref()
    }

    pub fn cache(&self) -> &CacheManager<SymbolSnapshot> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        self.cache.metrics()
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Benchmark symbol, upper-cased.
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Fetchers in the order they are tried.
    pub fn fetchers(&self) -> impl Iterator<Item = &RateLimitedFetcher> {
        std::iter::once(&self.primary).chain(self.fallback.as_ref())
    }
}

fn build_provider(kind: ProviderKind, config: &ProviderConfig) -> Result<Arc<dyn BarProvider>, MarketError> {
    let provider: Arc<dyn BarProvider> = match kind {
        ProviderKind::Yahoo => Arc::new(YahooProvider::new(&config.yahoo)?),
        ProviderKind::Csv => Arc::new(CsvProvider::new(config.csv_dir.clone())),
    };
    Ok(provider)
}

/// One fetcher per upstream source, each with its own breaker and semaphore.
fn build_fetcher(
    kind: ProviderKind,
    config: &AppConfig,
    validator: &Arc<BarValidator>,
) -> Result<RateLimitedFetcher, MarketError> {
    let provider = build_provider(kind, &config.provider)?;
    let breaker = Arc::new(CircuitBreaker::new(provider.name(), config.circuit_breaker.clone()));
    Ok(RateLimitedFetcher::new(
        provider,
        breaker,
        Arc::clone(validator),
        config.fetcher.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_cache::StoreBackend;

    #[test]
    fn test_from_config_builds_both_fetchers() {
        let mut config = AppConfig::default();
        config.cache.store.backend = StoreBackend::Memory;
        config.indicators.benchmark = " spy ".into();

        let ctx = MarketContext::from_config(&config).unwrap();

        assert_eq!(ctx.primary().source(), "yahoo");
        assert_eq!(ctx.fallback().map(|f| f.source()), Some("csv"));
        assert_eq!(ctx.fetchers().count(), 2);
        assert_eq!(ctx.cache().l2_name(), "memory");
        assert_eq!(ctx.benchmark(), "SPY");
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = AppConfig::default();
        config.fetcher.max_concurrency = 0;
        assert!(matches!(MarketContext::from_config(&config), Err(MarketError::Config(_))));
    }
}
