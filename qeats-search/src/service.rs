//! Restaurant discovery service.

use std::sync::Arc;

use chrono::NaiveTime;
use qeats_core::{
    Coordinate, DiscoveryConfig, GetRestaurantsRequest, GetRestaurantsResponse, QeatsResult,
    RadiusPolicy, RestaurantRecord,
};
use qeats_storage::{CacheBackend, ProximityCache, RestaurantStore};
use tracing::{info, instrument};

use crate::aggregator::{Aggregator, ExecutionMode};

/// Public entry point of the discovery engine.
///
/// Owns the radius policy, the proximity cache and the search aggregator,
/// all sharing one store.
pub struct RestaurantService<S: ?Sized, C: CacheBackend> {
    store: Arc<S>,
    cache: ProximityCache<C>,
    radius: RadiusPolicy,
    aggregator: Aggregator<S>,
}

impl<S, C> RestaurantService<S, C>
where
    S: RestaurantStore + ?Sized + 'static,
    C: CacheBackend,
{
    /// Build a service from a validated configuration.
    pub fn new(store: Arc<S>, backend: Arc<C>, config: &DiscoveryConfig) -> QeatsResult<Self> {
        config.validate()?;
        Ok(Self {
            cache: ProximityCache::new(backend, config.cache.clone())?,
            radius: RadiusPolicy::new(config.radius.clone()),
            aggregator: Aggregator::new(Arc::clone(&store), &config.search),
            store,
        })
    }

    pub fn radius_policy(&self) -> &RadiusPolicy {
        &self.radius
    }

    pub fn cache(&self) -> &ProximityCache<C> {
        &self.cache
    }

    /// Restaurants open at `time` within the serving radius of `origin`.
    ///
    /// Store failures propagate; cache failures do not.
    #[instrument(skip(self))]
    pub async fn find_nearby(
        &self,
        origin: Coordinate,
        time: NaiveTime,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        let radius_km = self.radius.effective_radius_km(time);
        let read = self
            .cache
            .get(origin, time, radius_km, self.store.as_ref())
            .await?;
        info!(
            radius_km,
            cache_hit = read.was_cache_hit(),
            count = read.value().len(),
            "nearby lookup"
        );
        Ok(read.into_value())
    }

    /// Search by every criterion, one after another.
    pub async fn search(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
    ) -> Vec<RestaurantRecord> {
        self.run_search(origin, query, time, ExecutionMode::Sequential)
            .await
    }

    /// Search by every criterion concurrently.
    pub async fn search_concurrent(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
    ) -> Vec<RestaurantRecord> {
        self.run_search(origin, query, time, ExecutionMode::Concurrent)
            .await
    }

    #[instrument(skip(self))]
    async fn run_search(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        mode: ExecutionMode,
    ) -> Vec<RestaurantRecord> {
        let radius_km = self.radius.effective_radius_km(time);
        let found = self
            .aggregator
            .combine(origin, query, time, radius_km, mode)
            .await;
        info!(radius_km, count = found.len(), "search");
        found
    }

    /// Validate `request` and list nearby restaurants.
    pub async fn find_restaurants_close_by(
        &self,
        request: &GetRestaurantsRequest,
        time: NaiveTime,
    ) -> QeatsResult<GetRestaurantsResponse> {
        let origin = request.origin()?;
        Ok(GetRestaurantsResponse::new(
            self.find_nearby(origin, time).await?,
        ))
    }

    /// Validate `request` and search sequentially.
    pub async fn find_restaurants_by_search_query(
        &self,
        request: &GetRestaurantsRequest,
        time: NaiveTime,
    ) -> QeatsResult<GetRestaurantsResponse> {
        let origin = request.origin()?;
        let query = request.query()?;
        Ok(GetRestaurantsResponse::new(
            self.search(origin, query, time).await,
        ))
    }

    /// Validate `request` and search concurrently.
    pub async fn find_restaurants_by_search_query_mt(
        &self,
        request: &GetRestaurantsRequest,
        time: NaiveTime,
    ) -> QeatsResult<GetRestaurantsResponse> {
        let origin = request.origin()?;
        let query = request.query()?;
        Ok(GetRestaurantsResponse::new(
            self.search_concurrent(origin, query, time).await,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qeats_storage::InMemoryCacheBackend;
    use qeats_test_utils::assertions::{assert_validation_error, ids};
    use qeats_test_utils::fixtures::{lunch_peak, origin, scenario_store};
    use qeats_test_utils::InMemoryStore;

    fn service() -> RestaurantService<InMemoryStore, InMemoryCacheBackend> {
        RestaurantService::new(
            Arc::new(scenario_store()),
            Arc::new(InMemoryCacheBackend::new()),
            &DiscoveryConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DiscoveryConfig::default();
        config.cache.ttl_secs = 0;
        let result = RestaurantService::new(
            Arc::new(scenario_store()),
            Arc::new(InMemoryCacheBackend::new()),
            &config,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_find_nearby_uses_peak_radius() {
        let found = service().find_nearby(origin(), lunch_peak()).await.unwrap();
        // "3" is 4 km away and "4" opens at 18:00.
        assert_eq!(ids(&found), vec!["1", "2", "6"]);
    }

    #[tokio::test]
    async fn test_request_wrappers_validate() {
        let svc = service();
        let missing = GetRestaurantsRequest::default();
        assert_validation_error(&svc.find_restaurants_close_by(&missing, lunch_peak()).await);

        let no_query = GetRestaurantsRequest::new(28.49, 77.53);
        assert_validation_error(
            &svc.find_restaurants_by_search_query(&no_query, lunch_peak())
                .await,
        );

        let ok = no_query.with_search_for("tamil");
        let response = svc
            .find_restaurants_by_search_query_mt(&ok, lunch_peak())
            .await
            .unwrap();
        assert_eq!(ids(&response.restaurants), vec!["1", "2"]);
    }
}
