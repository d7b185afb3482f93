//! Upstream provider adapter trait.

use crate::error::FetchError;
use crate::types::{Bar, Period};
use async_trait::async_trait;

/// Narrow adapter over an upstream market-data source.
///
/// Implementations translate a provider's wire format into bars and its
/// failure modes into [`FetchError`]. They do not retry, throttle or track
/// circuit state: the fetcher owns all of that, so swapping a provider never
/// touches concurrency or backoff logic.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch daily bars for `symbol` covering `period`.
    ///
    /// # Returns
    /// Raw, unvalidated bars. Ordering and duplicates are not guaranteed.
    async fn fetch_bars(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, FetchError>;

    /// Stable source identifier, used to key circuit breakers and logs.
    fn name(&self) -> &str;
}
