//! In-process cache backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use qeats_core::QeatsResult;
use tokio::sync::RwLock;

use super::traits::{CacheBackend, CacheStats};

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    stats: CacheStats,
}

/// TTL map guarded by an async `RwLock`.
///
/// Expired entries are removed lazily when read. Availability can be
/// switched off to exercise the bypass path.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    inner: RwLock<Inner>,
    available: AtomicBool,
}

impl Default for InMemoryCacheBackend {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the backend reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drop every entry. Statistics are kept.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.stats.entry_count = 0;
        inner.stats.memory_bytes = 0;
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &str) -> QeatsResult<Option<Vec<u8>>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                let value = entry.value.clone();
                inner.stats.hits += 1;
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            if let Some(entry) = inner.entries.remove(key) {
                inner.stats.expirations += 1;
                inner.stats.entry_count = inner.stats.entry_count.saturating_sub(1);
                inner.stats.memory_bytes = inner
                    .stats
                    .memory_bytes
                    .saturating_sub(entry.value.len() as u64);
            }
        }
        inner.stats.misses += 1;
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> QeatsResult<()> {
        let mut inner = self.inner.write().await;
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        match inner.entries.insert(key.to_string(), entry) {
            Some(previous) => {
                inner.stats.memory_bytes = inner
                    .stats
                    .memory_bytes
                    .saturating_sub(previous.value.len() as u64);
            }
            None => inner.stats.entry_count += 1,
        }
        inner.stats.memory_bytes += value.len() as u64;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn stats(&self) -> QeatsResult<CacheStats> {
        Ok(self.inner.read().await.stats.clone())
    }
}

/// A backend that is never available. Every lookup computes directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCacheBackend;

#[async_trait]
impl CacheBackend for NullCacheBackend {
    async fn get(&self, _key: &str) -> QeatsResult<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set_with_ttl(&self, _key: &str, _value: &[u8], _ttl: Duration) -> QeatsResult<()> {
        Ok(())
    }

    async fn is_available(&self) -> bool {
        false
    }

    async fn stats(&self) -> QeatsResult<CacheStats> {
        Ok(CacheStats::default())
    }
}
