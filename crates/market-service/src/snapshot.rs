//! Snapshot requests: cache first, then the fetchers, then indicators.

use crate::context::MarketContext;
use chrono::{DateTime, Utc};
use market_cache::{CacheStats, Layer};
use market_core::error::FetchError;
use market_core::types::{IndicatorSet, Period, SymbolSeries};
use market_data::{CircuitStatus, ValidatedSeries, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache namespace for per-symbol snapshots.
pub const SNAPSHOT_NAMESPACE: &str = "snapshot";

/// Everything known about one symbol for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub period: Period,
    /// Source that served the bars
    pub provider: String,
    pub fetched_at: DateTime<Utc>,
    pub series: SymbolSeries,
    pub indicators: IndicatorSet,
    pub report: ValidationReport,
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    L1,
    L2,
    Upstream,
    /// Results came from more than one tier
    Mixed,
    /// Nothing was served
    None,
}

impl From<Layer> for CacheSource {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::L1 => CacheSource::L1,
            Layer::L2 => CacheSource::L2,
        }
    }
}

impl CacheSource {
    fn aggregate(sources: impl IntoIterator<Item = CacheSource>) -> Self {
        let mut sources = sources.into_iter();
        let Some(first) = sources.next() else {
            return CacheSource::None;
        };
        if sources.all(|s| s == first) {
            first
        } else {
            CacheSource::Mixed
        }
    }
}

/// Outcome for one requested symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolResult {
    pub symbol: String,
    /// Tier that served the snapshot, `None` on failure
    pub source: Option<CacheSource>,
    pub result: Result<SymbolSnapshot, FetchError>,
}

impl SymbolResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Response to a snapshot request, one result per distinct symbol in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub period: Period,
    pub generated_at: DateTime<Utc>,
    pub cache_source: CacheSource,
    pub results: Vec<SymbolResult>,
}

impl Snapshot {
    pub fn get(&self, symbol: &str) -> Option<&SymbolResult> {
        self.results.iter().find(|r| r.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Cache statistics plus the state of every upstream breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub cache: CacheStats,
    pub circuits: Vec<CircuitStatus>,
}

/// Bars fetched for one symbol together with the source that served them.
struct Fetched {
    provider: String,
    result: Result<ValidatedSeries, FetchError>,
}

/// Serves snapshot and health requests over a shared [`MarketContext`].
#[derive(Clone)]
pub struct SnapshotService {
    ctx: Arc<MarketContext>,
}

impl SnapshotService {
    pub fn new(ctx: Arc<MarketContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<MarketContext> {
        &self.ctx
    }

    /// Snapshot for every symbol in `symbols`.
    ///
    /// Symbols are trimmed, upper-cased and de-duplicated. A failure for one
    /// symbol is reported in its own result and never fails the request.
    pub async fn get_snapshot(&self, symbols: &[String], period: Period) -> Snapshot {
        let symbols = normalize(symbols);
        let cache = self.ctx.cache();

        let mut resolved: HashMap<String, SymbolResult> = HashMap::with_capacity(symbols.len());
        let mut misses = Vec::new();

        for symbol in &symbols {
            let lookup = cache.get(SNAPSHOT_NAMESPACE, &cache_key(symbol, period)).await;
            match (lookup.value, lookup.tier) {
                (Some(snapshot), Some(tier)) => {
                    resolved.insert(
                        symbol.clone(),
                        SymbolResult {
                            symbol: symbol.clone(),
                            source: Some(tier.into()),
                            result: Ok(snapshot),
                        },
                    );
                }
                _ => misses.push(symbol.clone()),
            }
        }

        if !misses.is_empty() {
            debug!(misses = misses.len(), hits = resolved.len(), %period, "Cache misses");
            let cached_benchmark = resolved
                .get(self.ctx.benchmark())
                .and_then(|r| r.result.as_ref().ok())
                .map(|snapshot| snapshot.series.clone());
            for result in self.refresh(&misses, period, cached_benchmark).await {
                resolved.insert(result.symbol.clone(), result);
            }
        }

        self.ctx.metrics().check_health();

        let results: Vec<SymbolResult> = symbols
            .iter()
            .filter_map(|symbol| resolved.remove(symbol))
            .collect();
        let cache_source = CacheSource::aggregate(results.iter().filter_map(|r| r.source));

        let snapshot = Snapshot {
            period,
            generated_at: Utc::now(),
            cache_source,
            results,
        };
        info!(
            %period,
            symbols = snapshot.results.len(),
            succeeded = snapshot.succeeded(),
            failed = snapshot.failed(),
            cache_source = ?snapshot.cache_source,
            "Snapshot served"
        );
        snapshot
    }

    /// Current cache statistics and breaker states.
    pub fn get_health(&self) -> HealthReport {
        HealthReport {
            generated_at: Utc::now(),
            cache: self.ctx.metrics().stats(),
            circuits: self.ctx.fetchers().map(|f| f.breaker().status()).collect(),
        }
    }

    /// Fetch, compute and cache every symbol in `misses`.
    ///
    /// `cached_benchmark` is the benchmark series when this request already
    /// read it from the cache.
    async fn refresh(
        &self,
        misses: &[String],
        period: Period,
        cached_benchmark: Option<SymbolSeries>,
    ) -> Vec<SymbolResult> {
        let benchmark = self.ctx.benchmark().to_string();
        let mut to_fetch = misses.to_vec();

        let mut benchmark_series = cached_benchmark;
        if benchmark_series.is_none() && !misses.contains(&benchmark) {
            let lookup = self
                .ctx
                .cache()
                .peek(SNAPSHOT_NAMESPACE, &cache_key(&benchmark, period))
                .await;
            match lookup.value {
                Some(snapshot) => benchmark_series = Some(snapshot.series),
                None => to_fetch.push(benchmark.clone()),
            }
        }

        let mut fetched = self.fetch_all(&to_fetch, period).await;
        if benchmark_series.is_none() {
            benchmark_series = fetched
                .get(&benchmark)
                .and_then(|f| f.result.as_ref().ok())
                .map(|validated| validated.series.clone());
        }
        if benchmark_series.is_none() {
            warn!(%benchmark, %period, "Benchmark unavailable; relative strength left neutral");
        }

        let mut results = Vec::with_capacity(misses.len());
        for symbol in &to_fetch {
            let Some(fetch) = fetched.remove(symbol) else {
                continue;
            };
            let outcome = fetch.result.and_then(|validated| {
                self.build_snapshot(period, fetch.provider, validated, benchmark_series.as_ref())
            });

            match &outcome {
                Ok(snapshot) => self.store(snapshot).await,
                Err(e) => warn!(symbol = %symbol, kind = e.kind(), error = %e, "Symbol unavailable"),
            }

            if misses.contains(symbol) {
                results.push(SymbolResult {
                    symbol: symbol.clone(),
                    source: outcome.is_ok().then_some(CacheSource::Upstream),
                    result: outcome,
                });
            }
        }
        results
    }

    /// Primary first; symbols it could not serve are retried on the fallback.
    ///
    /// When both fail the primary's error is kept.
    async fn fetch_all(&self, symbols: &[String], period: Period) -> HashMap<String, Fetched> {
        let primary = self.ctx.primary();
        let mut fetched = HashMap::with_capacity(symbols.len());
        let mut retry = Vec::new();

        for fetch in primary.batch_fetch(symbols, period).await {
            if fetch.result.is_err() {
                retry.push(fetch.symbol.clone());
            }
            fetched.insert(
                fetch.symbol,
                Fetched {
                    provider: primary.source().to_string(),
                    result: fetch.result,
                },
            );
        }

        let Some(fallback) = self.ctx.fallback() else {
            return fetched;
        };
        if retry.is_empty() {
            return fetched;
        }

        info!(
            count = retry.len(),
            primary = primary.source(),
            fallback = fallback.source(),
            "Retrying failed symbols on fallback"
        );
        for fetch in fallback.batch_fetch(&retry, period).await {
            match fetch.result {
                Ok(validated) => {
                    fetched.insert(
                        fetch.symbol,
                        Fetched {
                            provider: fallback.source().to_string(),
                            result: Ok(validated),
                        },
                    );
                }
                Err(e) => debug!(symbol = %fetch.symbol, error = %e, "Fallback failed"),
            }
        }
        fetched
    }

    fn build_snapshot(
        &self,
        period: Period,
        provider: String,
        validated: ValidatedSeries,
        benchmark: Option<&SymbolSeries>,
    ) -> Result<SymbolSnapshot, FetchError> {
        let ValidatedSeries { series, report } = validated;
        let indicators = self
            .ctx
            .engine()
            .compute(&series, benchmark)
            .map_err(|e| FetchError::Indicator(e.to_string()))?;

        Ok(SymbolSnapshot {
            symbol: series.symbol.clone(),
            period,
            provider,
            fetched_at: Utc::now(),
            series,
            indicators,
            report,
        })
    }

    async fn store(&self, snapshot: &SymbolSnapshot) {
        for _ in &snapshot.report.warnings {
            self.ctx.metrics().record_quality_warning(&snapshot.symbol);
        }
        // Retried on the next request so the rotation fields fill in.
        if snapshot.indicators.benchmark_missing {
            debug!(symbol = %snapshot.symbol, "Not caching snapshot computed without benchmark");
            return;
        }
        self.ctx
            .cache()
            .set(
                SNAPSHOT_NAMESPACE,
                &cache_key(&snapshot.symbol, snapshot.period),
                snapshot.clone(),
            )
            .await;
    }
}

fn cache_key(symbol: &str, period: Period) -> String {
    format!("{symbol}:{period}")
}

fn normalize(symbols: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use market_cache::{CacheConfig, CacheManager, CacheMetrics, MemoryStore, MetricsConfig};
    use market_core::traits::{BarProvider, KvStore};
    use market_core::types::Bar;
    use market_data::{
        BarValidator, CircuitBreaker, CircuitBreakerConfig, CircuitState, FetcherConfig, RateLimitedFetcher,
        ValidationConfig,
    };
    use market_indicators::{IndicatorConfig, IndicatorEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves fixed bars per symbol; unknown symbols are not found.
    struct MapProvider {
        name: &'static str,
        bars: HashMap<String, Vec<Bar>>,
        down: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MapProvider {
        fn new(name: &'static str, symbols: &[(&str, f64)]) -> Arc<Self> {
            let bars = symbols
                .iter()
                .map(|(symbol, drift)| (symbol.to_string(), trending_bars(*drift, 2_000_000.0)))
                .collect();
            Arc::new(Self {
                name,
                bars,
                down: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn down(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                bars: HashMap::new(),
                down: true,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn with_bars(name: &'static str, symbol: &str, bars: Vec<Bar>) -> Arc<Self> {
            Arc::new(Self {
                name,
                bars: HashMap::from([(symbol.to_string(), bars)]),
                down: false,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, symbol: &str) -> usize {
            self.calls().iter().filter(|s| *s == symbol).count()
        }
    }

    #[async_trait]
    impl BarProvider for MapProvider {
        async fn fetch_bars(&self, symbol: &str, _period: Period) -> Result<Vec<Bar>, FetchError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            if self.down {
                return Err(FetchError::Transient("503 Service Unavailable".into()));
            }
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| FetchError::SymbolNotFound(symbol.to_string()))
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn trending_bars(drift: f64, volume: f64) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..40)
            .map(|i| {
                let date = start + chrono::Duration::days(i);
                let close = 100.0 + i as f64 * drift;
                Bar::on_date(date, close - 0.5, close + 1.0, close - 1.0, close, volume)
            })
            .collect()
    }

    fn fetcher(provider: Arc<MapProvider>) -> RateLimitedFetcher {
        let breaker = Arc::new(CircuitBreaker::new(provider.name, CircuitBreakerConfig::default()));
        let config = FetcherConfig {
            min_request_interval_ms: 0,
            base_delay_ms: 10,
            max_delay_ms: 40,
            ..FetcherConfig::default()
        };
        RateLimitedFetcher::new(
            provider,
            breaker,
            Arc::new(BarValidator::new(ValidationConfig::default())),
            config,
        )
    }

    fn context_with_store(
        primary: Arc<MapProvider>,
        fallback: Option<Arc<MapProvider>>,
        store: Arc<dyn KvStore>,
    ) -> Arc<MarketContext> {
        let metrics = Arc::new(CacheMetrics::new(MetricsConfig::default()));
        let cache = CacheManager::new(&CacheConfig::default(), store, metrics).unwrap();
        Arc::new(MarketContext::new(
            fetcher(primary),
            fallback.map(fetcher),
            cache,
            IndicatorEngine::new(&IndicatorConfig::default()),
            "SPY",
        ))
    }

    fn service(primary: Arc<MapProvider>, fallback: Option<Arc<MapProvider>>) -> SnapshotService {
        SnapshotService::new(context_with_store(primary, fallback, Arc::new(MemoryStore::new())))
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_second_request_served_from_l1() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLF", 0.1), ("SPY", 0.4)]);
        let svc = service(provider.clone(), None);

        let first = svc.get_snapshot(&symbols(&["XLK", "XLF"]), Period::ThreeMonths).await;
        assert_eq!(first.cache_source, CacheSource::Upstream);
        assert_eq!(first.succeeded(), 2);
        let calls_after_first = provider.calls().len();

        let second = svc.get_snapshot(&symbols(&["XLK", "XLF"]), Period::ThreeMonths).await;
        assert_eq!(second.cache_source, CacheSource::L1);
        assert_eq!(second.succeeded(), 2);
        assert_eq!(provider.calls().len(), calls_after_first);
    }

    #[tokio::test]
    async fn test_results_follow_request_order_and_dedupe() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLF", 0.1), ("SPY", 0.4)]);
        let svc = service(provider, None);

        let snap = svc
            .get_snapshot(&symbols(&["xlf", " XLK ", "XLF", ""]), Period::ThreeMonths)
            .await;

        let order: Vec<&str> = snap.results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["XLF", "XLK"]);
    }

    #[tokio::test]
    async fn test_benchmark_fetched_once_and_cached() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLE", -0.2), ("SPY", 0.4)]);
        let svc = service(provider.clone(), None);

        let snap = svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;
        assert!(snap.get("XLK").unwrap().is_ok());
        // Not requested, so not reported.
        assert!(snap.get("SPY").is_none());

        svc.get_snapshot(&symbols(&["XLE"]), Period::ThreeMonths).await;
        assert_eq!(provider.calls_for("SPY"), 1);
    }

    #[tokio::test]
    async fn test_relative_strength_against_benchmark() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLU", 0.05), ("SPY", 0.4)]);
        let svc = service(provider, None);

        let snap = svc
            .get_snapshot(&symbols(&["XLK", "XLU", "SPY"]), Period::ThreeMonths)
            .await;

        let rs = |s: &str| {
            snap.get(s).unwrap().result.as_ref().unwrap().indicators.relative_strength
        };
        assert!(rs("XLK") > 100.0);
        assert!(rs("XLU") < 100.0);
        assert!((rs("SPY") - 100.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_serves_when_primary_down() {
        let primary = MapProvider::down("primary");
        let fallback = MapProvider::new("fallback", &[("XLK", 0.8), ("SPY", 0.4)]);
        let svc = service(primary, Some(fallback.clone()));

        let snap = svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;

        let result = snap.get("XLK").unwrap();
        let snapshot = result.result.as_ref().unwrap();
        assert_eq!(snapshot.provider, "fallback");
        assert_eq!(result.source, Some(CacheSource::Upstream));
        assert_eq!(fallback.calls_for("XLK"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_error_kept_when_both_fail() {
        let primary = MapProvider::new("primary", &[("SPY", 0.4)]);
        let fallback = MapProvider::new("fallback", &[]);
        let svc = service(primary, Some(fallback));

        let snap = svc.get_snapshot(&symbols(&["NOPE", "SPY"]), Period::ThreeMonths).await;

        assert_eq!(
            snap.get("NOPE").unwrap().result,
            Err(FetchError::SymbolNotFound("NOPE".into()))
        );
        assert_eq!(snap.get("NOPE").unwrap().source, None);
        assert!(snap.get("SPY").unwrap().is_ok());
        assert_eq!(snap.failed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_benchmark_still_serves_symbols() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLF", 0.1)]);
        let svc = service(provider.clone(), None);

        let snap = svc.get_snapshot(&symbols(&["XLK", "XLF"]), Period::ThreeMonths).await;

        assert_eq!(snap.succeeded(), 2);
        assert_eq!(snap.cache_source, CacheSource::Upstream);
        let xlk = snap.get("XLK").unwrap().result.as_ref().unwrap();
        assert!(xlk.indicators.benchmark_missing);
        assert_eq!(xlk.indicators.relative_strength(), None);
        assert_eq!(xlk.indicators.last_obv(), Some(39.0 * 2_000_000.0));
        assert_eq!(xlk.series.len(), 40);

        // Not cached, so the next request tries the benchmark again.
        let again = svc.get_snapshot(&symbols(&["XLK", "XLF"]), Period::ThreeMonths).await;
        assert_eq!(again.succeeded(), 2);
        assert_eq!(again.cache_source, CacheSource::Upstream);
        assert_eq!(provider.calls_for("XLK"), 2);
        assert_eq!(provider.calls_for("SPY"), 2);
    }

    #[tokio::test]
    async fn test_benchmark_lookup_not_counted_twice() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("SPY", 0.4)]);
        let svc = service(provider.clone(), None);

        svc.get_snapshot(&symbols(&["SPY"]), Period::ThreeMonths).await;
        let snap = svc.get_snapshot(&symbols(&["SPY", "XLK"]), Period::ThreeMonths).await;

        assert_eq!(snap.succeeded(), 2);
        let l1 = svc.get_health().cache.layers[&Layer::L1];
        assert_eq!(l1.lookups(), 3);
        assert_eq!(l1.hits, 1);
        assert_eq!(provider.calls_for("SPY"), 1);
    }

    #[tokio::test]
    async fn test_cached_benchmark_lookup_not_counted() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLE", -0.2), ("SPY", 0.4)]);
        let svc = service(provider, None);

        svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;
        svc.get_snapshot(&symbols(&["XLE"]), Period::ThreeMonths).await;

        let l1 = svc.get_health().cache.layers[&Layer::L1];
        assert_eq!(l1.lookups(), 2);
        assert_eq!(l1.hits, 0);
    }

    #[tokio::test]
    async fn test_rejected_bars_and_warnings_reported() {
        let mut bars = trending_bars(0.3, 50_000.0);
        bars[5].high = bars[5].low - 1.0;
        let provider = Arc::new(MapProvider {
            name: "primary",
            bars: HashMap::from([("XLK".to_string(), bars), ("SPY".to_string(), trending_bars(0.4, 2_000_000.0))]),
            down: false,
            calls: Mutex::new(Vec::new()),
        });
        let mut validation = ValidationConfig::default();
        validation.instrument_classes.insert("XLK".into(), market_core::types::InstrumentClass::Etf);
        let breaker = Arc::new(CircuitBreaker::new("primary", CircuitBreakerConfig::default()));
        let fetcher = RateLimitedFetcher::new(
            provider,
            breaker,
            Arc::new(BarValidator::new(validation)),
            FetcherConfig {
                min_request_interval_ms: 0,
                ..FetcherConfig::default()
            },
        );
        let metrics = Arc::new(CacheMetrics::new(MetricsConfig::default()));
        let cache = CacheManager::new(&CacheConfig::default(), Arc::new(MemoryStore::new()), metrics).unwrap();
        let ctx = MarketContext::new(fetcher, None, cache, IndicatorEngine::default(), "SPY");
        let svc = SnapshotService::new(Arc::new(ctx));

        let snap = svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;

        let snapshot = snap.get("XLK").unwrap().result.as_ref().unwrap();
        assert_eq!(snapshot.series.len(), 39);
        assert_eq!(snapshot.report.rejected.len(), 1);
        assert_eq!(snapshot.report.rejected[0].index, 5);
        assert_eq!(snapshot.report.warnings.len(), 39);
        assert_eq!(svc.get_health().cache.quality_warnings.get("XLK"), Some(&39));
    }

    #[tokio::test]
    async fn test_shared_store_serves_second_process_from_l2() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let first_provider = MapProvider::new("primary", &[("XLK", 0.8), ("SPY", 0.4)]);
        let first = SnapshotService::new(context_with_store(first_provider, None, Arc::clone(&store)));
        first.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;

        let second_provider = MapProvider::new("primary", &[("XLK", 0.8), ("SPY", 0.4)]);
        let second = SnapshotService::new(context_with_store(second_provider.clone(), None, store));
        let snap = second.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;

        assert_eq!(snap.cache_source, CacheSource::L2);
        assert!(second_provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_cache_source() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("XLF", 0.1), ("SPY", 0.4)]);
        let svc = service(provider, None);

        svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;
        let snap = svc.get_snapshot(&symbols(&["XLK", "XLF"]), Period::ThreeMonths).await;

        assert_eq!(snap.get("XLK").unwrap().source, Some(CacheSource::L1));
        assert_eq!(snap.get("XLF").unwrap().source, Some(CacheSource::Upstream));
        assert_eq!(snap.cache_source, CacheSource::Mixed);
    }

    #[tokio::test]
    async fn test_periods_cached_separately() {
        let provider = MapProvider::new("primary", &[("XLK", 0.8), ("SPY", 0.4)]);
        let svc = service(provider.clone(), None);

        svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;
        let snap = svc.get_snapshot(&symbols(&["XLK"]), Period::OneMonth).await;

        assert_eq!(snap.cache_source, CacheSource::Upstream);
        assert_eq!(provider.calls_for("XLK"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_lists_every_breaker() {
        let svc = service(MapProvider::down("primary"), Some(MapProvider::down("fallback")));

        for _ in 0..2 {
            svc.get_snapshot(&symbols(&["XLK"]), Period::ThreeMonths).await;
        }

        let health = svc.get_health();
        let sources: Vec<&str> = health.circuits.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["primary", "fallback"]);
        assert!(health.circuits.iter().all(|c| c.state == CircuitState::Open));
    }

    #[test]
    fn test_aggregate_cache_source() {
        assert_eq!(CacheSource::aggregate([]), CacheSource::None);
        assert_eq!(CacheSource::aggregate([CacheSource::L2, CacheSource::L2]), CacheSource::L2);
        assert_eq!(
            CacheSource::aggregate([CacheSource::L1, CacheSource::Upstream]),
            CacheSource::Mixed
        );
    }
}
