//! End-to-end discovery tests over the Greater Noida fixture.

use std::sync::Arc;

use qeats_core::{CacheKeyScope, DiscoveryConfig, GetRestaurantsRequest, QeatsResult};
use qeats_search::RestaurantService;
use qeats_storage::{CacheBackend, InMemoryCacheBackend, LmdbCacheBackend, NullCacheBackend};
use qeats_test_utils::assertions::{assert_unique_ids, ids};
use qeats_test_utils::fixtures::{afternoon, hms, lunch_peak, origin, scenario_store};
use qeats_test_utils::{CountingStore, InMemoryStore, StoreCall};

fn service_with<C: CacheBackend>(
    backend: C,
    config: DiscoveryConfig,
) -> QeatsResult<RestaurantService<InMemoryStore, C>> {
    RestaurantService::new(Arc::new(scenario_store()), Arc::new(backend), &config)
}

fn default_service() -> RestaurantService<InMemoryStore, InMemoryCacheBackend> {
    service_with(InMemoryCacheBackend::new(), DiscoveryConfig::default()).unwrap()
}

#[tokio::test]
async fn tamil_search_at_lunch_peak() -> QeatsResult<()> {
    let svc = default_service();
    let request = GetRestaurantsRequest::new(28.49, 77.53).with_search_for("tamil");

    let response = svc
        .find_restaurants_by_search_query(&request, lunch_peak())
        .await?;

    // "1" by name (and item attribute), "2" by item name. "3" is beyond the
    // 3 km peak radius, "4" is closed, "5" is 20 km away.
    assert_eq!(ids(&response.restaurants), vec!["1", "2"]);
    assert_unique_ids(&response.restaurants);
    Ok(())
}

#[tokio::test]
async fn tamil_search_off_peak_widens_radius() {
    let svc = default_service();
    let found = svc.search(origin(), "tamil", afternoon()).await;
    assert_eq!(ids(&found), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn restaurant_matching_two_criteria_appears_once_at_first_position() {
    let svc = default_service();
    // "1" matches by name and by item attribute ("Tamil Special").
    let found = svc.search_concurrent(origin(), "TAMIL", lunch_peak()).await;
    assert_eq!(found.iter().filter(|r| r.restaurant_id.as_str() == "1").count(), 1);
    assert_eq!(found[0].restaurant_id.as_str(), "1");
}

#[tokio::test]
async fn cuisine_matching_is_opt_in() {
    let mut config = DiscoveryConfig::default();
    config.search.match_cuisines = true;
    let svc = service_with(InMemoryCacheBackend::new(), config).unwrap();

    // "2" now also arrives through its "Tamil" cuisine, ahead of the item criteria.
    let found = svc.search(origin(), "tamil", lunch_peak()).await;
    assert_eq!(ids(&found), vec!["1", "2"]);

    let found = svc.search(origin(), "south indian", afternoon()).await;
    assert_eq!(ids(&found), vec!["1", "3"]);

    let default = default_service();
    assert!(default
        .search(origin(), "south indian", afternoon())
        .await
        .is_empty());
}

#[tokio::test]
async fn search_is_idempotent() {
    let svc = default_service();
    let first = svc.search(origin(), "tamil", lunch_peak()).await;
    for _ in 0..3 {
        assert_eq!(svc.search(origin(), "tamil", lunch_peak()).await, first);
        assert_eq!(svc.search_concurrent(origin(), "tamil", lunch_peak()).await, first);
    }
}

#[tokio::test]
async fn empty_query_returns_nothing() -> QeatsResult<()> {
    let svc = default_service();
    let request = GetRestaurantsRequest::new(28.49, 77.53).with_search_for("");
    let response = svc
        .find_restaurants_by_search_query_mt(&request, lunch_peak())
        .await?;
    assert!(response.restaurants.is_empty());
    Ok(())
}

#[tokio::test]
async fn find_nearby_lists_open_restaurants_in_range() -> QeatsResult<()> {
    let svc = default_service();
    let request = GetRestaurantsRequest::new(28.49, 77.53);
    let response = svc.find_restaurants_close_by(&request, lunch_peak()).await?;
    assert_eq!(ids(&response.restaurants), vec!["1", "2", "6"]);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["restaurants"][0]["restaurantId"], "1");
    assert!(json["restaurants"][0]["latitude"].as_f64().unwrap() > 28.49);
    Ok(())
}

#[tokio::test]
async fn find_nearby_late_night_is_empty() {
    let svc = default_service();
    let found = svc.find_nearby(origin(), hms(23, 30, 0)).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn find_nearby_is_served_from_cache() {
    let store = Arc::new(CountingStore::new(scenario_store()));
    let svc = RestaurantService::new(
        Arc::clone(&store),
        Arc::new(InMemoryCacheBackend::new()),
        &DiscoveryConfig::default(),
    )
    .unwrap();

    let first = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    let second = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.count(StoreCall::AllRestaurants), 1);

    let stats = svc.cache().backend().stats().await.unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn origin_scoped_cache_reuses_peak_entry_off_peak() {
    let svc = default_service();
    let peak = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    // Same cell, different radius: the entry filled at peak is reused.
    let off_peak = svc.find_nearby(origin(), afternoon()).await.unwrap();
    assert_eq!(peak, off_peak);
}

#[tokio::test]
async fn radius_hour_scoped_cache_recomputes_off_peak() {
    let mut config = DiscoveryConfig::default();
    config.cache.key_scope = CacheKeyScope::OriginRadiusHour;
    let svc = service_with(InMemoryCacheBackend::new(), config).unwrap();

    let _ = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    let off_peak = svc.find_nearby(origin(), afternoon()).await.unwrap();
    assert_eq!(ids(&off_peak), vec!["1", "2", "3", "6"]);
}

#[tokio::test]
async fn unavailable_cache_is_transparent() {
    let cached = default_service();
    let uncached = service_with(NullCacheBackend, DiscoveryConfig::default()).unwrap();
    assert_eq!(
        cached.find_nearby(origin(), lunch_peak()).await.unwrap(),
        uncached.find_nearby(origin(), lunch_peak()).await.unwrap()
    );
}

#[tokio::test]
async fn lmdb_cache_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let backend = LmdbCacheBackend::new(dir.path(), 16).unwrap();
    let svc = service_with(backend, DiscoveryConfig::default()).unwrap();

    let first = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    let second = svc.find_nearby(origin(), lunch_peak()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(svc.cache().backend().stats().await.unwrap().hits, 1);
}

#[tokio::test]
async fn invalid_request_is_a_client_error() {
    let svc = default_service();
    let request = GetRestaurantsRequest::new(123.0, 77.53).with_search_for("tamil");
    let err = svc
        .find_restaurants_by_search_query(&request, lunch_peak())
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}
