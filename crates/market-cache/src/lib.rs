//! Tiered caching for market snapshots.
//!
//! - [`CacheManager`]: process-local LRU in front of a shared [`KvStore`]
//! - [`MarketHoursTtl`]: shared-tier TTL chosen by exchange session
//! - [`CacheMetrics`]: hit-rate counters and floor-based health
//!
//! [`KvStore`]: market_core::traits::KvStore

mod lru;
pub mod manager;
pub mod metrics;
pub mod store;
pub mod ttl;

pub use lru::LruCache;
pub use manager::{CacheConfig, CacheEntry, CacheLookup, CacheManager};
pub use metrics::{CacheMetrics, CacheStats, CounterStats, Health, Layer, MetricsConfig, NamespaceStats};
pub use store::{FileStore, MemoryStore, StoreBackend, StoreConfig};
pub use ttl::{MarketHoursConfig, MarketHoursTtl};
