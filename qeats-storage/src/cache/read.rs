//! Cache read results.

/// Where a cached read's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// A live cache entry.
    Cache,
    /// Computed from the store after a miss and written back.
    Computed,
    /// Computed from the store without touching the cache because the
    /// backend was unavailable or failed.
    Bypassed,
}

/// Result of a cache read, carrying its provenance.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    key: String,
    source: ReadSource,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, key: impl Into<String>, source: ReadSource) -> Self {
        Self {
            value,
            key: key.into(),
            source,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// The cache key the read was resolved under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    /// Check if this was a cache hit.
    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            key: self.key,
            source: self.source,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
