//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped
//! key-value store shared across processes on one host.
//!
//! # Value Layout
//!
//! `[expires_at: 8 bytes, i64 LE unix millis][payload]`
//!
//! Expired entries, and values too short to carry an expiry, are deleted
//! the first time a read observes them and reported as misses.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The backend uses:
//! - Read transactions for `get`
//! - Write transactions for `set_with_ttl` and expiry deletion
//! - Statistics are tracked behind a `RwLock`

use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use qeats_core::{CacheError, QeatsError, QeatsResult};
use tracing::warn;

use super::traits::{CacheBackend, CacheStats};

const EXPIRY_PREFIX_LEN: usize = 8;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored value is shorter than its expiry prefix.
    #[error("Corrupt entry for {0}")]
    CorruptEntry(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for QeatsError {
    fn from(e: LmdbCacheError) -> Self {
        QeatsError::Cache(CacheError::Backend {
            reason: e.to_string(),
        })
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache.
///
/// # Example
///
/// ```ignore
/// use qeats_storage::cache::LmdbCacheBackend;
///
/// let backend = LmdbCacheBackend::new("/tmp/qeats-cache", 64)?;
/// backend.set_with_ttl("ttnfv2u", b"[]", Duration::from_secs(3600)).await?;
/// let cached = backend.get("ttnfv2u").await?;
/// ```
pub struct LmdbCacheBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Str, Bytes>,
    /// Running statistics.
    stats: RwLock<CacheStats>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per backend and the
        // directory is not opened twice within this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        let entry_count = {
            let rtxn = env.read_txn().map_err(txn_err)?;
            db.len(&rtxn).map_err(txn_err)?
        };

        Ok(Self {
            env,
            db,
            stats: RwLock::new(CacheStats {
                entry_count,
                ..Default::default()
            }),
        })
    }

    fn record(&self, f: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            f(&mut stats);
        }
    }

    /// Split a stored value into its expiry and payload.
    fn decode(key: &str, bytes: &[u8]) -> Result<(i64, Vec<u8>), LmdbCacheError> {
        if bytes.len() < EXPIRY_PREFIX_LEN {
            return Err(LmdbCacheError::CorruptEntry(key.to_string()));
        }
        let (prefix, payload) = bytes.split_at(EXPIRY_PREFIX_LEN);
        let expiry: [u8; EXPIRY_PREFIX_LEN] = prefix
            .try_into()
            .map_err(|_| LmdbCacheError::CorruptEntry(key.to_string()))?;
        Ok((i64::from_le_bytes(expiry), payload.to_vec()))
    }

    /// Write `bytes` under `key` without an expiry prefix.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, key: &str, bytes: &[u8]) -> Result<(), LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db.put(&mut wtxn, key, bytes).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)
    }

    /// Remove `key`. `expired` counts the removal as an expiration rather
    /// than a discarded corrupt entry.
    fn delete_entry(
        &self,
        key: &str,
        size_bytes: usize,
        expired: bool,
    ) -> Result<(), LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        if deleted {
            self.record(|s| {
                if expired {
                    s.expirations += 1;
                }
                s.entry_count = s.entry_count.saturating_sub(1);
                s.memory_bytes = s.memory_bytes.saturating_sub(size_bytes as u64);
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &str) -> QeatsResult<Option<Vec<u8>>> {
        let found = {
            let rtxn = self.env.read_txn().map_err(txn_err)?;
            match self.db.get(&rtxn, key) {
                Ok(Some(bytes)) => Some((Self::decode(key, bytes), bytes.len())),
                Ok(None) => None,
                Err(e) => {
                    self.record(|s| s.misses += 1);
                    return Err(txn_err(e).into());
                }
            }
        };

        match found {
            Some((Ok((expires_at, payload)), _))
                if expires_at > Utc::now().timestamp_millis() =>
            {
                self.record(|s| s.hits += 1);
                Ok(Some(payload))
            }
            Some((Ok(_), size_bytes)) => {
                self.delete_entry(key, size_bytes, true)?;
                self.record(|s| s.misses += 1);
                Ok(None)
            }
            // No readable expiry: drop it so the next write replaces it.
            Some((Err(e), size_bytes)) => {
                warn!(key, error = %e, "discarding corrupt cache entry");
                self.delete_entry(key, size_bytes, false)?;
                self.record(|s| s.misses += 1);
                Ok(None)
            }
            None => {
                self.record(|s| s.misses += 1);
                Ok(None)
            }
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> QeatsResult<()> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp_millis().saturating_add(ttl_millis);

        let mut full_bytes = Vec::with_capacity(EXPIRY_PREFIX_LEN + value.len());
        full_bytes.extend_from_slice(&expires_at.to_le_bytes());
        full_bytes.extend_from_slice(value);

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let previous_len = self
            .db
            .get(&wtxn, key)
            .map_err(txn_err)?
            .map(|bytes| bytes.len());
        self.db
            .put(&mut wtxn, key, &full_bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;

        self.record(|s| {
            match previous_len {
                Some(len) => s.memory_bytes = s.memory_bytes.saturating_sub(len as u64),
                None => s.entry_count += 1,
            }
            s.memory_bytes += full_bytes.len() as u64;
        });
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.env.read_txn().is_ok()
    }

    async fn stats(&self) -> QeatsResult<CacheStats> {
        self.stats
            .read()
            .map(|s| s.clone())
            .map_err(|_| {
                CacheError::Backend {
                    reason: "statistics lock poisoned".to_string(),
                }
                .into()
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backend() -> (LmdbCacheBackend, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend =
            LmdbCacheBackend::new(temp_dir.path(), 10).expect("Failed to create LMDB backend");
        (backend, temp_dir)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (backend, _temp_dir) = create_test_backend();

        backend
            .set_with_ttl("ttnfv2u", br#"[{"name":"A2B"}]"#, Duration::from_secs(60))
            .await
            .expect("set should succeed");

        let cached = backend.get("ttnfv2u").await.expect("get should succeed");
        assert_eq!(cached, Some(br#"[{"name":"A2B"}]"#.to_vec()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (backend, _temp_dir) = create_test_backend();
        let cached = backend.get("missing").await.expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted() {
        let (backend, _temp_dir) = create_test_backend();

        backend
            .set_with_ttl("k", b"[]", Duration::from_millis(5))
            .await
            .expect("set should succeed");
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(backend.get("k").await.expect("get should succeed").is_none());
        let stats = backend.stats().await.expect("stats should succeed");
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let (backend, _temp_dir) = create_test_backend();

        let _ = backend.get("k").await;
        backend
            .set_with_ttl("k", b"payload", Duration::from_secs(60))
            .await
            .expect("set should succeed");
        let _ = backend.get("k").await;
        let _ = backend.get("k").await;

        let stats = backend.stats().await.expect("stats should succeed");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, (EXPIRY_PREFIX_LEN + 7) as u64);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (backend, _temp_dir) = create_test_backend();
        let ttl = Duration::from_secs(60);

        backend.set_with_ttl("k", b"old", ttl).await.expect("set");
        backend.set_with_ttl("k", b"new", ttl).await.expect("set");

        assert_eq!(backend.get("k").await.expect("get"), Some(b"new".to_vec()));
        assert_eq!(backend.stats().await.expect("stats").entry_count, 1);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        {
            let backend = LmdbCacheBackend::new(temp_dir.path(), 10).expect("open");
            backend
                .set_with_ttl("k", b"[]", Duration::from_secs(60))
                .await
                .expect("set");
        }
        let backend = LmdbCacheBackend::new(temp_dir.path(), 10).expect("reopen");
        assert_eq!(backend.stats().await.expect("stats").entry_count, 1);
        assert_eq!(backend.get("k").await.expect("get"), Some(b"[]".to_vec()));
    }

    #[test]
    fn test_decode_rejects_short_values() {
        assert!(matches!(
            LmdbCacheBackend::decode("k", &[1, 2, 3]),
            Err(LmdbCacheError::CorruptEntry(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss_and_is_replaced() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend = LmdbCacheBackend::new(temp_dir.path(), 10).expect("open");
        backend.put_raw("ttnfv2u", b"abc").expect("put");

        assert_eq!(backend.get("ttnfv2u").await.expect("get"), None);
        let stats = backend.stats().await.expect("stats");
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 0);

        backend
            .set_with_ttl("ttnfv2u", b"[]", Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(
            backend.get("ttnfv2u").await.expect("get"),
            Some(b"[]".to_vec())
        );
    }
}
