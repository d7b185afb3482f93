//! Rate-limited concurrent fetcher.
//!
//! Pulls raw bars for a batch of symbols from one upstream provider with a
//! bounded number of in-flight requests, per-slot request spacing, retry
//! with exponential backoff, a circuit breaker around every attempt and an
//! overall batch deadline. Each symbol resolves independently.

use crate::circuit_breaker::CircuitBreaker;
use crate::validator::{BarValidator, ValidatedSeries};
use futures::stream::{FuturesUnordered, StreamExt};
use market_core::error::FetchError;
use market_core::traits::BarProvider;
use market_core::types::{Bar, Period};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, sleep_until, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Default number of concurrent upstream requests.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fetcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Semaphore capacity
    pub max_concurrency: usize,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay; doubles per retry
    pub base_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Minimum spacing between requests on the same slot
    pub min_request_interval_ms: u64,
    /// Per-attempt timeout around the provider call
    pub request_timeout_ms: u64,
    /// Overall deadline for one batch
    pub batch_deadline_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            min_request_interval_ms: 2_000,
            request_timeout_ms: 15_000,
            batch_deadline_secs: 120,
        }
    }
}

impl FetcherConfig {
    /// Backoff before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }
}

/// Outcome for one symbol of a batch.
#[derive(Debug, Clone)]
pub struct SymbolFetch {
    pub symbol: String,
    pub result: Result<ValidatedSeries, FetchError>,
}

/// Bounded, retrying, breaker-guarded fetcher for a single upstream source.
pub struct RateLimitedFetcher {
    provider: Arc<dyn BarProvider>,
    breaker: Arc<CircuitBreaker>,
    validator: Arc<BarValidator>,
    semaphore: Arc<Semaphore>,
    config: FetcherConfig,
}

impl RateLimitedFetcher {
    /// Create a fetcher. The semaphore is owned by this fetcher.
    pub fn new(
        provider: Arc<dyn BarProvider>,
        breaker: Arc<CircuitBreaker>,
        validator: Arc<BarValidator>,
        config: FetcherConfig,
    ) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            provider,
            breaker,
            validator,
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
        }
    }

    /// Name of the upstream source.
    pub fn source(&self) -> &str {
        self.provider.name()
    }

    /// Breaker guarding the upstream source.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch and validate every symbol.
    ///
    /// Returns one entry per distinct symbol once all have settled or the
    /// batch deadline fires, in completion order. Symbols still pending at
    /// the deadline are abandoned and reported as `DeadlineExceeded`.
    pub async fn batch_fetch(&self, symbols: &[String], period: Period) -> Vec<SymbolFetch> {
        let deadline = Instant::now() + self.config.batch_deadline();

        let mut seen = HashSet::new();
        let unique: Vec<&str> = symbols
            .iter()
            .map(String::as_str)
            .filter(|s| seen.insert(*s))
            .collect();

        let mut pending: FuturesUnordered<_> = unique
            .iter()
            .map(|&symbol| async move { (symbol, self.fetch_symbol(symbol, period).await) })
            .collect();

        let mut results = Vec::with_capacity(unique.len());
        let mut settled = HashSet::new();

        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((symbol, result))) => {
                    settled.insert(symbol);
                    results.push(SymbolFetch {
                        symbol: symbol.to_string(),
                        result,
                    });
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        source = self.source(),
                        unresolved = unique.len() - settled.len(),
                        deadline_secs = self.config.batch_deadline_secs,
                        "Batch deadline exceeded"
                    );
                    break;
                }
            }
        }
        drop(pending);

        for symbol in unique.iter().filter(|s| !settled.contains(*s)) {
            results.push(SymbolFetch {
                symbol: symbol.to_string(),
                result: Err(FetchError::DeadlineExceeded),
            });
        }

        let failed = results.iter().filter(|r| r.result.is_err()).count();
        info!(
            source = self.source(),
            %period,
            symbols = results.len(),
            failed,
            "Batch fetch complete"
        );

        results
    }

    /// Fetch and validate one symbol, retrying retryable failures.
    pub async fn fetch_symbol(&self, symbol: &str, period: Period) -> Result<ValidatedSeries, FetchError> {
        let raw = self.fetch_with_retry(symbol, period).await?;
        self.validator.validate_series(symbol, period, raw)
    }

    async fn fetch_with_retry(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.attempt(symbol, period).await {
                Ok(bars) => return Ok(bars),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let mut delay = self.config.backoff(attempt);
                    if let FetchError::RateLimited {
                        retry_after_secs: Some(secs),
                    } = err
                    {
                        delay = delay.max(Duration::from_secs(secs));
                    }
                    attempt += 1;
                    warn!(
                        source = self.source(),
                        symbol,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying fetch"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    debug!(source = self.source(), symbol, kind = err.kind(), "Fetch failed");
                    return Err(err);
                }
            }
        }
    }

    /// One upstream attempt inside a semaphore slot.
    async fn attempt(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FetchError> {
        // Fail fast instead of queueing behind the semaphore.
        if self.breaker.is_rejecting() {
            return Err(self.breaker.open_error());
        }

        let slot = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Transient("fetcher semaphore closed".to_string()))?;

        let permit = self.breaker.try_acquire()?;
        let started = Instant::now();

        debug!(source = self.source(), symbol, %period, "Requesting bars");
        let outcome = match timeout(self.config.request_timeout(), self.provider.fetch_bars(symbol, period)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Timeout(self.config.request_timeout_ms)),
        };

        match &outcome {
            Err(err) if err.is_source_failure() => permit.record_failure(),
            _ => permit.record_success(),
        }

        self.release_after_interval(slot, started);
        outcome
    }

    /// Keep the slot busy until the minimum request interval has passed.
    fn release_after_interval(&self, slot: OwnedSemaphorePermit, started: Instant) {
        let free_at = started + self.config.min_request_interval();
        if Instant::now() >= free_at {
            return;
        }
        tokio::spawn(async move {
            sleep_until(free_at).await;
            drop(slot);
        });
    }
}
