//! Circuit breaker guarding an upstream data source.
//!
//! One breaker exists per upstream source (not per symbol). After
//! `failure_threshold` consecutive failures it opens and refuses every call
//! for `open_timeout`. The first call after the timeout becomes a half-open
//! probe; `success_threshold` consecutive probe successes close it again,
//! and any probe failure re-opens it.

use market_core::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Consecutive failures that open a closed breaker.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Consecutive half-open successes that close the breaker.
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;

/// How long an open breaker refuses calls.
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 60;

/// Breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            open_timeout_secs: DEFAULT_OPEN_TIMEOUT_SECS,
        }
    }
}

impl CircuitBreakerConfig {
    fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_secs)
    }
}

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; requests are allowed.
    Closed,
    /// Tripped; requests are refused until the timeout expires.
    Open,
    /// Probing; a single request is allowed through.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of a breaker, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStatus {
    pub source: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Seconds until an open breaker admits a probe
    pub retry_in_secs: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    next_retry_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Three-state circuit breaker for one upstream source.
#[derive(Debug)]
pub struct CircuitBreaker {
    source: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for `source`.
    pub fn new(source: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            source: source.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                next_retry_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Source identifier this breaker guards.
    pub fn source(&self) -> &str {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn retry_in_secs(inner: &Inner, now: Instant) -> u64 {
        inner
            .next_retry_at
            .map(|at| at.saturating_duration_since(now).as_secs_f64().ceil() as u64)
            .unwrap_or(0)
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        if to == CircuitState::Open {
            warn!(
                source = %self.source,
                %from,
                %to,
                failure_count = inner.failure_count,
                success_count = inner.success_count,
                "Circuit state transition"
            );
        } else {
            info!(
                source = %self.source,
                %from,
                %to,
                failure_count = inner.failure_count,
                success_count = inner.success_count,
                "Circuit state transition"
            );
        }
    }

    fn open(&self, inner: &mut Inner, now: Instant) {
        inner.next_retry_at = Some(now + self.config.open_timeout());
        inner.success_count = 0;
        inner.probe_in_flight = false;
        self.transition(inner, CircuitState::Open);
    }

    fn rejection(&self, inner: &Inner, now: Instant) -> FetchError {
        FetchError::CircuitOpen {
            source_name: self.source.clone(),
            retry_in_secs: Self::retry_in_secs(inner, now),
        }
    }

    /// Ask to make one upstream call.
    ///
    /// Moves an expired open breaker to half-open. In half-open only one
    /// probe may be in flight; every other caller is refused.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, FetchError> {
        let now = Instant::now();
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            match inner.next_retry_at {
                Some(at) if now >= at => {
                    inner.success_count = 0;
                    self.transition(&mut inner, CircuitState::HalfOpen);
                }
                _ => return Err(self.rejection(&inner, now)),
            }
        }

        match inner.state {
            CircuitState::Closed => Ok(BreakerPermit::new(self, false)),
            CircuitState::HalfOpen if !inner.probe_in_flight => {
                inner.probe_in_flight = true;
                Ok(BreakerPermit::new(self, true))
            }
            _ => Err(self.rejection(&inner, now)),
        }
    }

    /// Whether a call made now would be refused. Does not change state.
    pub fn is_rejecting(&self) -> bool {
        let now = Instant::now();
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open => inner.next_retry_at.map_or(true, |at| now < at),
            CircuitState::HalfOpen => inner.probe_in_flight,
        }
    }

    /// Refusal error for a caller that checked [`is_rejecting`](Self::is_rejecting).
    pub fn open_error(&self) -> FetchError {
        let now = Instant::now();
        let inner = self.lock();
        self.rejection(&inner, now)
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Snapshot for monitoring.
    pub fn status(&self) -> CircuitStatus {
        let now = Instant::now();
        let inner = self.lock();
        CircuitStatus {
            source: self.source.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            retry_in_secs: (inner.state == CircuitState::Open).then(|| Self::retry_in_secs(&inner, now)),
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen if probe => {
                inner.probe_in_flight = false;
                inner.failure_count = 0;
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    inner.success_count = 0;
                    inner.next_retry_at = None;
                    self.transition(&mut inner, CircuitState::Closed);
                }
            }
            // Outcomes of calls admitted before the breaker opened are stale.
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let now = Instant::now();
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.failure_threshold {
                    self.open(&mut inner, now);
                }
            }
            CircuitState::HalfOpen if probe => {
                inner.failure_count += 1;
                self.open(&mut inner, now);
            }
            _ => {}
        }
    }

    fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }
}

/// Admission to make one upstream call; report its outcome when done.
///
/// Dropping an unsettled permit (for example when the caller is cancelled)
/// frees the half-open probe slot without counting an outcome.
#[must_use = "report the call outcome with record_success or record_failure"]
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// Whether this call is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// The call succeeded.
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    /// The call failed in a way attributable to the source.
    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe();
        }
    }
}
