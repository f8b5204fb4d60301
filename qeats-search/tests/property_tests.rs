//! Property tests over randomly generated neighbourhoods.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use qeats_core::{is_eligible, DiscoveryConfig, RadiusPolicy, RadiusConfig, RestaurantRecord};
use qeats_search::RestaurantService;
use qeats_storage::{Dataset, InMemoryStore, NullCacheBackend};
use qeats_test_utils::assertions::assert_unique_ids;
use qeats_test_utils::fixtures::origin;
use qeats_test_utils::generators::{arb_restaurants, arb_time};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn service(restaurants: Vec<RestaurantRecord>) -> RestaurantService<InMemoryStore, NullCacheBackend> {
    let store = InMemoryStore::from_dataset(Dataset {
        restaurants,
        menus: Vec::new(),
        items: Vec::new(),
    })
    .unwrap();
    RestaurantService::new(
        Arc::new(store),
        Arc::new(NullCacheBackend),
        &DiscoveryConfig::default(),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_nearby_is_exactly_the_eligible_set(
        restaurants in arb_restaurants(origin(), 12),
        time in arb_time(),
    ) {
        let radius = RadiusPolicy::new(RadiusConfig::default()).effective_radius_km(time);
        let expected: HashSet<_> = restaurants
            .iter()
            .filter(|r| is_eligible(r, origin(), time, radius))
            .map(|r| r.restaurant_id.clone())
            .collect();

        let svc = service(restaurants);
        let found = runtime().block_on(svc.find_nearby(origin(), time)).unwrap();

        assert_unique_ids(&found);
        let actual: HashSet<_> = found.into_iter().map(|r| r.restaurant_id).collect();
        prop_assert_eq!(expected, actual);
    }

    #[test]
    fn prop_search_results_are_eligible_and_unique(
        restaurants in arb_restaurants(origin(), 12),
        time in arb_time(),
        query in prop::sample::select(vec!["tamil", "Punjabi", "udupi", "chinese", "South Indian"]),
    ) {
        let radius = RadiusPolicy::new(RadiusConfig::default()).effective_radius_km(time);
        let svc = service(restaurants);
        let rt = runtime();

        let sequential = rt.block_on(svc.search(origin(), query, time));
        let concurrent = rt.block_on(svc.search_concurrent(origin(), query, time));

        assert_unique_ids(&sequential);
        for r in &sequential {
            prop_assert!(is_eligible(r, origin(), time, radius));
            prop_assert!(r.name.eq_ignore_ascii_case(query));
        }
        prop_assert_eq!(sequential, concurrent);
    }
}
