//! Request-level operations.
//!
//! [`SnapshotService::get_snapshot`] answers from the cache where it can and
//! fetches the rest through the rate-limited fetchers, falling back to the
//! secondary source for symbols the primary could not serve.
//! [`SnapshotService::get_health`] reports cache hit rates and breaker states.

pub mod context;
pub mod snapshot;

pub use context::MarketContext;
pub use snapshot::{
    CacheSource, HealthReport, Snapshot, SnapshotService, SymbolResult, SymbolSnapshot, SNAPSHOT_NAMESPACE,
};
