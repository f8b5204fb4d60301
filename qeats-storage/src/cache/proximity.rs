//! Read-through cache for proximity scans.
//!
//! A proximity scan reads every restaurant and keeps the ones open and within
//! the serving radius. The result is memoized under the geohash cell of the
//! origin so that requests from the same few hundred metres share one scan.

use std::sync::Arc;

use chrono::{NaiveTime, Timelike};
use qeats_core::{
    is_eligible, CacheKeyScope, CacheSettings, Coordinate, QeatsResult, RestaurantRecord,
    SpatialKeyer,
};
use tracing::{debug, warn};

use super::read::{CacheRead, ReadSource};
use super::traits::CacheBackend;
use crate::RestaurantStore;

/// Scan the whole store and keep restaurants eligible at `time`.
pub async fn scan_eligible<S>(
    store: &S,
    origin: Coordinate,
    time: NaiveTime,
    radius_km: f64,
) -> QeatsResult<Vec<RestaurantRecord>>
where
    S: RestaurantStore + ?Sized,
{
    Ok(store
        .all_restaurants()
        .await?
        .into_iter()
        .filter(|r| is_eligible(r, origin, time, radius_km))
        .collect())
}

/// Memoizes [`scan_eligible`] results in a [`CacheBackend`].
///
/// Cache hits are returned as stored, without re-filtering. With
/// [`CacheKeyScope::Origin`] the key ignores radius and time, so a hit may
/// reflect the radius and opening state of whichever request filled it.
pub struct ProximityCache<C: CacheBackend> {
    backend: Arc<C>,
    keyer: SpatialKeyer,
    settings: CacheSettings,
}

impl<C: CacheBackend> ProximityCache<C> {
    /// Create a proximity cache over `backend`.
    ///
    /// Fails if the configured geohash precision is out of range.
    pub fn new(backend: Arc<C>, settings: CacheSettings) -> QeatsResult<Self> {
        let keyer = SpatialKeyer::new(settings.geohash_precision)?;
        Ok(Self {
            backend,
            keyer,
            settings,
        })
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// The cache key a request resolves to.
    pub fn key_for(&self, origin: Coordinate, time: NaiveTime, radius_km: f64) -> String {
        let cell = self.keyer.key_for(origin);
        match self.settings.key_scope {
            CacheKeyScope::Origin => cell.to_string(),
            CacheKeyScope::OriginRadiusHour => {
                let radius_m = (radius_km * 1000.0).round() as u64;
                format!("{}:{}:{:02}", cell, radius_m, time.hour())
            }
        }
    }

    /// Restaurants eligible around `origin`, from cache when possible.
    ///
    /// Cache failures never surface: an unavailable or failing backend
    /// degrades to a direct scan and an undecodable entry counts as a miss.
    /// Store failures propagate.
    pub async fn get<S>(
        &self,
        origin: Coordinate,
        time: NaiveTime,
        radius_km: f64,
        store: &S,
    ) -> QeatsResult<CacheRead<Vec<RestaurantRecord>>>
    where
        S: RestaurantStore + ?Sized,
    {
        let key = self.key_for(origin, time, radius_km);

        if !self.backend.is_available().await {
            debug!(key = %key, "cache unavailable, scanning store");
            let restaurants = scan_eligible(store, origin, time, radius_km).await?;
            return Ok(CacheRead::new(restaurants, key, ReadSource::Bypassed));
        }

        match self.backend.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<RestaurantRecord>>(&bytes) {
                Ok(restaurants) => {
                    debug!(key = %key, count = restaurants.len(), "cache hit");
                    return Ok(CacheRead::new(restaurants, key, ReadSource::Cache));
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding undecodable cache entry");
                }
            },
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(e) => {
                warn!(key = %key, error = %e, "cache read failed, scanning store");
                let restaurants = scan_eligible(store, origin, time, radius_km).await?;
                return Ok(CacheRead::new(restaurants, key, ReadSource::Bypassed));
            }
        }

        let restaurants = scan_eligible(store, origin, time, radius_km).await?;
        self.store_entry(&key, &restaurants).await;
        Ok(CacheRead::new(restaurants, key, ReadSource::Computed))
    }

    async fn store_entry(&self, key: &str, restaurants: &[RestaurantRecord]) {
        let payload = match serde_json::to_vec(restaurants) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self
            .backend
            .set_with_ttl(key, &payload, self.settings.ttl())
            .await
        {
            warn!(key = %key, error = %e, "cache write failed");
        }
    }
}
