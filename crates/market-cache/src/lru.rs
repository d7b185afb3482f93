//! Bounded LRU map with per-entry expiry, used as the process-local tier.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    expires_at: Instant,
    tick: u64,
}

/// Least-recently-used map. Not synchronised; callers wrap it in a mutex.
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    ttl: Duration,
    slots: HashMap<String, Slot<V>>,
    /// Access tick -> key, oldest first
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl<V: Clone> LruCache<V> {
    /// Create a cache holding at most `capacity` entries for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ttl,
            slots: HashMap::with_capacity(capacity),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Live value for `key`, marking it most recently used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        let tick = self.bump();
        let slot = self.slots.get_mut(key)?;

        if now >= slot.expires_at {
            let old = slot.tick;
            self.slots.remove(key);
            self.order.remove(&old);
            return None;
        }

        self.order.remove(&slot.tick);
        slot.tick = tick;
        self.order.insert(tick, key.to_string());
        Some(slot.value.clone())
    }

    /// Insert or replace, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: &str, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Like [`insert`](Self::insert), but expiring after `ttl` if that is
    /// shorter than the cache TTL.
    pub fn insert_with_ttl(&mut self, key: &str, value: V, ttl: Duration) {
        let tick = self.bump();
        let expires_at = Instant::now() + ttl.min(self.ttl);

        if let Some(old) = self.slots.remove(key) {
            self.order.remove(&old.tick);
        } else if self.slots.len() >= self.capacity {
            self.evict_one();
        }

        self.slots.insert(
            key.to_string(),
            Slot {
                value,
                expires_at,
                tick,
            },
        );
        self.order.insert(tick, key.to_string());
    }

    /// Remove `key` if present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.slots.remove(key) {
            Some(slot) => {
                self.order.remove(&slot.tick);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_one(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.slots.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.get("a"), Some(1));

        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let mut cache = LruCache::new(4, Duration::from_secs(60));
        cache.insert("a", "x");

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("a"), Some("x"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_entry_ttl_wins() {
        let mut cache = LruCache::new(4, Duration::from_secs(60));
        cache.insert_with_ttl("short", 1, Duration::from_secs(5));
        cache.insert_with_ttl("long", 2, Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(2));

        // Never longer than the cache TTL.
        tokio::time::advance(Duration::from_secs(55)).await;
        assert_eq!(cache.get("long"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn replace_keeps_size() {
        let mut cache = LruCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("a", 2);
        cache.insert("b", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(2));
        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
    }
}
