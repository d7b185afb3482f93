//! Two-tier cache manager.
//!
//! L1 is a process-local LRU; L2 is a [`KvStore`] shared by every process
//! instance. Reads try L1 then L2 and promote L2 hits; writes go to both
//! tiers. An unavailable L2 degrades to L1-only operation and never fails
//! the caller.

use crate::lru::LruCache;
use crate::metrics::{CacheMetrics, Layer};
use crate::store::StoreConfig;
use crate::ttl::{MarketHoursConfig, MarketHoursTtl};
use chrono::{DateTime, Utc};
use market_core::error::MarketError;
use market_core::traits::KvStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default L1 capacity in entries.
pub const DEFAULT_L1_CAPACITY: usize = 512;

/// Default L1 TTL.
pub const DEFAULT_L1_TTL_SECS: u64 = 60;

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub l1_capacity: usize,
    pub l1_ttl_secs: u64,
    /// Prefix of every shared-tier key
    pub key_prefix: String,
    pub market_hours: MarketHoursConfig,
    pub store: StoreConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: DEFAULT_L1_CAPACITY,
            l1_ttl_secs: DEFAULT_L1_TTL_SECS,
            key_prefix: "market".to_string(),
            market_hours: MarketHoursConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// A cached value with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub key: String,
    pub namespace: String,
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    pub tier: Layer,
}

impl<V> CacheEntry<V> {
    /// Time left before the entry expires, zero once it has.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let ttl = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX);
        self.stored_at
            .checked_add_signed(ttl)
            .map(|expires_at| (expires_at - now).to_std().unwrap_or(Duration::ZERO))
            .unwrap_or(Duration::MAX)
    }
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup<V> {
    pub hit: bool,
    /// Tier that served the hit
    pub tier: Option<Layer>,
    pub value: Option<V>,
}

impl<V> CacheLookup<V> {
    fn miss() -> Self {
        Self {
            hit: false,
            tier: None,
            value: None,
        }
    }

    fn hit(tier: Layer, value: V) -> Self {
        Self {
            hit: true,
            tier: Some(tier),
            value: Some(value),
        }
    }
}

/// L1 + L2 cache for values of type `V`.
pub struct CacheManager<V> {
    l1: Mutex<LruCache<CacheEntry<V>>>,
    l2: Arc<dyn KvStore>,
    ttl_policy: MarketHoursTtl,
    metrics: Arc<CacheMetrics>,
    key_prefix: String,
    l1_ttl: Duration,
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a manager over the given shared store.
    pub fn new(config: &CacheConfig, l2: Arc<dyn KvStore>, metrics: Arc<CacheMetrics>) -> Result<Self, MarketError> {
        let ttl_policy = MarketHoursTtl::from_config(&config.market_hours)?;
        let l1_ttl = Duration::from_secs(config.l1_ttl_secs);
        Ok(Self {
            l1: Mutex::new(LruCache::new(config.l1_capacity, l1_ttl)),
            l2,
            ttl_policy,
            metrics,
            key_prefix: config.key_prefix.clone(),
            l1_ttl,
        })
    }

    pub fn metrics(&self) -> &Arc<CacheMetrics> {
        &self.metrics
    }

    /// Name of the shared store.
    pub fn l2_name(&self) -> &str {
        self.l2.name()
    }

    fn lock_l1(&self) -> MutexGuard<'_, LruCache<CacheEntry<V>>> {
        self.l1.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn l1_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    fn l2_key(&self, namespace: &str, key: &str) -> String {
        format!("{}:{namespace}:{key}", self.key_prefix)
    }

    /// Look up `key` in L1, then L2. L2 hits are promoted into L1.
    pub async fn get(&self, namespace: &str, key: &str) -> CacheLookup<V> {
        self.lookup(namespace, key, true).await
    }

    /// Same as [`get`](Self::get) without touching the hit/miss counters.
    ///
    /// For lookups the service makes on its own behalf, which would
    /// otherwise skew the hit rates callers see.
    pub async fn peek(&self, namespace: &str, key: &str) -> CacheLookup<V> {
        self.lookup(namespace, key, false).await
    }

    async fn lookup(&self, namespace: &str, key: &str, record: bool) -> CacheLookup<V> {
        let count = |layer: Layer, hit: bool| {
            if record {
                if hit {
                    self.metrics.record_hit(layer, Some(namespace));
                } else {
                    self.metrics.record_miss(layer, Some(namespace));
                }
            }
        };

        let l1_key = Self::l1_key(namespace, key);
        let cached = self.lock_l1().get(&l1_key);
        if let Some(entry) = cached {
            count(Layer::L1, true);
            debug!(namespace, key, "L1 hit");
            return CacheLookup::hit(Layer::L1, entry.value);
        }
        count(Layer::L1, false);

        let l2_key = self.l2_key(namespace, key);
        let bytes = match self.l2.get(&l2_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                count(Layer::L2, false);
                return CacheLookup::miss();
            }
            Err(e) => {
                warn!(store = self.l2.name(), key = %l2_key, error = %e, "L2 read failed, continuing with L1 only");
                count(Layer::L2, false);
                return CacheLookup::miss();
            }
        };

        match serde_json::from_slice::<CacheEntry<V>>(&bytes) {
            Ok(entry) => {
                count(Layer::L2, true);
                debug!(namespace, key, "L2 hit");
                // An L1 copy must not outlive the shared entry it came from.
                let remaining = entry.remaining(Utc::now());
                if !remaining.is_zero() {
                    let ttl = self.l1_ttl.min(remaining);
                    let promoted = CacheEntry {
                        tier: Layer::L1,
                        ttl_seconds: ttl.as_secs(),
                        ..entry.clone()
                    };
                    self.lock_l1().insert_with_ttl(&l1_key, promoted, ttl);
                }
                CacheLookup::hit(Layer::L2, entry.value)
            }
            Err(e) => {
                warn!(key = %l2_key, error = %e, "Discarding undecodable L2 entry");
                count(Layer::L2, false);
                if let Err(e) = self.l2.delete(&l2_key).await {
                    warn!(key = %l2_key, error = %e, "L2 delete failed");
                }
                CacheLookup::miss()
            }
        }
    }

    /// Store `value` in both tiers.
    pub async fn set(&self, namespace: &str, key: &str, value: V) {
        let now = Utc::now();
        let l2_ttl = self.ttl_policy.l2_ttl(now);

        let l2_entry = CacheEntry {
            key: key.to_string(),
            namespace: namespace.to_string(),
            value,
            stored_at: now,
            ttl_seconds: l2_ttl.as_secs(),
            tier: Layer::L2,
        };

        match serde_json::to_vec(&l2_entry) {
            Ok(bytes) => {
                let l2_key = self.l2_key(namespace, key);
                if let Err(e) = self.l2.put(&l2_key, bytes, l2_ttl.as_secs()).await {
                    warn!(store = self.l2.name(), key = %l2_key, error = %e, "L2 write failed, continuing with L1 only");
                }
            }
            Err(e) => warn!(namespace, key, error = %e, "Cache entry serialization failed"),
        }

        let l1_entry = CacheEntry {
            tier: Layer::L1,
            ttl_seconds: self.l1_ttl.as_secs(),
            ..l2_entry
        };
        self.lock_l1().insert(&Self::l1_key(namespace, key), l1_entry);
        debug!(namespace, key, l2_ttl_secs = l2_ttl.as_secs(), "Cached value");
    }

    /// Remove `key` from both tiers.
    pub async fn invalidate(&self, namespace: &str, key: &str) {
        self.lock_l1().remove(&Self::l1_key(namespace, key));
        let l2_key = self.l2_key(namespace, key);
        if let Err(e) = self.l2.delete(&l2_key).await {
            warn!(store = self.l2.name(), key = %l2_key, error = %e, "L2 delete failed");
        }
    }

    /// Drop every L1 entry. The shared tier is untouched.
    pub fn clear_l1(&self) {
        self.lock_l1().clear();
    }

    pub fn l1_len(&self) -> usize {
        self.lock_l1().len()
    }
}
