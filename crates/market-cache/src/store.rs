//! Shared-tier store implementations.

use async_trait::async_trait;
use chrono::Utc;
use market_core::error::CacheError;
use market_core::traits::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Shared-tier backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; not shared across processes
    Memory,
    /// One file per key under a directory shared by every process on the host
    #[default]
    File,
}

/// Shared-tier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dir: PathBuf::from(".cache/market"),
        }
    }
}

impl StoreConfig {
    /// Open the configured store.
    pub fn open(&self) -> Result<Arc<dyn KvStore>, CacheError> {
        let store: Arc<dyn KvStore> = match self.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File => Arc::new(FileStore::open(&self.dir)?),
        };
        Ok(store)
    }
}

fn expiry_ms(ttl_secs: u64) -> i64 {
    let ttl_ms = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    Utc::now().timestamp_millis().saturating_add(ttl_ms)
}

/// In-process store. Suitable for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, i64)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Utc::now().timestamp_millis();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get(key) {
            Some((_, expires_at)) => now >= *expires_at,
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = expiry_ms(ttl_secs);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Expiry line written ahead of the payload in each file.
#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    expires_at_ms: i64,
}

/// Directory-backed store shared by every process on a host.
///
/// One file per key: a JSON header line with the expiry, then the payload.
/// Writes go to a temp file first and are renamed into place, so readers
/// never see a partial value.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CacheError::Unavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for a key. Anything outside `[A-Za-z0-9._-]` is hex-escaped so
    /// distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 8);
        for byte in key.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'_' => name.push(byte as char),
                other => name.push_str(&format!("%{other:02X}")),
            }
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    fn tmp_path_for(&self, path: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}.{n}.tmp", std::process::id()));
        PathBuf::from(name)
    }

    fn decode(bytes: &[u8]) -> Option<(FileHeader, &[u8])> {
        let split = bytes.iter().position(|&b| b == b'\n')?;
        let header: FileHeader = serde_json::from_slice(&bytes[..split]).ok()?;
        Some((header, &bytes[split + 1..]))
    }

    async fn remove_file(path: &Path) -> Result<(), CacheError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Unavailable(format!("{}: {e}", path.display()))),
        }
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Unavailable(format!("{}: {e}", path.display()))),
        };

        let Some((header, payload)) = Self::decode(&bytes) else {
            warn!(key, path = %path.display(), "Discarding unreadable cache file");
            Self::remove_file(&path).await?;
            return Ok(None);
        };

        if Utc::now().timestamp_millis() >= header.expires_at_ms {
            debug!(key, "Cache file expired");
            Self::remove_file(&path).await?;
            return Ok(None);
        }

        Ok(Some(payload.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), CacheError> {
        let header = FileHeader {
            expires_at_ms: expiry_ms(ttl_secs),
        };
        let mut contents =
            serde_json::to_vec(&header).map_err(|e| CacheError::Serialization(e.to_string()))?;
        contents.push(b'\n');
        contents.extend_from_slice(&value);

        let path = self.path_for(key);
        let tmp_path = self.tmp_path_for(&path);

        tokio::fs::write(&tmp_path, &contents)
            .await
            .map_err(|e| CacheError::Unavailable(format!("{}: {e}", tmp_path.display())))?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(CacheError::Unavailable(format!("atomic rename failed: {e}")));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        Self::remove_file(&self.path_for(key)).await
    }

    fn name(&self) -> &str {
        "file"
    }
}
