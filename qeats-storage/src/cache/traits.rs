//! Cache backend trait.
//!
//! Backends store opaque byte payloads under string keys with a
//! per-entry time-to-live. Serialization of the payload is the caller's
//! concern.

use async_trait::async_trait;
use qeats_core::QeatsResult;
use std::time::Duration;

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe to share across tasks. An entry whose TTL
/// has elapsed is never returned by `get`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the payload stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> QeatsResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous entry. The entry
    /// expires `ttl` after this call.
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> QeatsResult<()>;

    /// Whether the backend can currently serve requests. Callers bypass an
    /// unavailable backend instead of calling `get`.
    async fn is_available(&self) -> bool;

    /// Get cache statistics.
    async fn stats(&self) -> QeatsResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired entries included.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate payload size in bytes.
    pub memory_bytes: u64,
    /// Number of entries dropped because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
