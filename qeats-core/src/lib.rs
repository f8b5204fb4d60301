//! QEats Core - Domain Types and Geo Policies
//!
//! Record types, identifiers, errors and configuration shared by every
//! QEats crate, plus the pure policies the discovery engine is built on:
//! haversine distance and opening hours ([`geo`]), geohash cache keys
//! ([`geohash`]) and the peak-hour serving radius ([`radius`]).
//!
//! Nothing in this crate performs I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod exchanges;
pub mod geo;
pub mod geohash;
pub mod identity;
pub mod radius;

pub use config::{
    CacheKeyScope, CacheSettings, DiscoveryConfig, PeakWindow, RadiusConfig, SearchConfig,
};
pub use entities::{Coordinate, MenuItemRecord, MenuRecord, RestaurantRecord};
pub use error::{
    CacheError, ConfigError, QeatsError, QeatsResult, SearchError, StoreError, ValidationError,
};
pub use exchanges::{GetRestaurantsRequest, GetRestaurantsResponse};
pub use geo::{distance_km, is_eligible, is_open_at};
pub use geohash::{SpatialKey, SpatialKeyer};
pub use identity::{ItemId, MenuId, RestaurantId};
pub use radius::RadiusPolicy;
