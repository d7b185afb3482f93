//! Shared key-value store trait backing the durable cache tier.

use crate::error::CacheError;
use async_trait::async_trait;

/// Durable store visible to every process instance.
///
/// Only per-key atomicity is assumed; concurrent writers to the same key
/// race and the last write wins.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value. Expired keys are reported as absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Write a value that expires after `ttl_secs`.
    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Get the store name.
    fn name(&self) -> &str;
}
