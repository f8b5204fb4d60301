//! Cache layer for proximity scans.
//!
//! [`ProximityCache`] sits between the discovery engine and the store. It
//! keys entries by the geohash cell of the request origin and stores JSON
//! encoded result lists in a pluggable [`CacheBackend`] with a fixed TTL.
//!
//! # Backends
//!
//! - [`InMemoryCacheBackend`]: process-local TTL map
//! - [`LmdbCacheBackend`]: persistent, memory-mapped LMDB store
//! - [`NullCacheBackend`]: always unavailable; every read scans the store
//!
//! # Example
//!
//! ```ignore
//! let cache = ProximityCache::new(Arc::new(InMemoryCacheBackend::new()), settings)?;
//! let read = cache.get(origin, time, radius_km, &store).await?;
//! if read.was_cache_hit() {
//!     tracing::debug!(key = read.key(), "served from cache");
//! }
//! ```

pub mod lmdb_backend;
pub mod memory;
pub mod proximity;
pub mod read;
pub mod traits;

pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory::{InMemoryCacheBackend, NullCacheBackend};
pub use proximity::{scan_eligible, ProximityCache};
pub use read::{CacheRead, ReadSource};
pub use traits::{CacheBackend, CacheStats};
