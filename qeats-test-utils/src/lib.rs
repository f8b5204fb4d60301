//! QEats Test Utilities
//!
//! Centralized test infrastructure for the QEats workspace:
//! - Store wrappers that inject latency, failures and call counting
//! - Proptest generators for coordinates, times and restaurants
//! - Test fixtures for the Greater Noida lunch-hour scenario
//! - Custom assertions for result lists

// Re-export the stores the wrappers decorate
pub use qeats_storage::{Dataset, InMemoryStore, RestaurantStore};

// Re-export core types for convenience
pub use qeats_core::{
    Coordinate, ItemId, MenuId, MenuItemRecord, MenuRecord, QeatsError, QeatsResult,
    RestaurantId, RestaurantRecord, StoreError,
};

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// STORE WRAPPERS
// ============================================================================

/// One method of [`RestaurantStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    AllRestaurants,
    RestaurantsByName,
    RestaurantsByAttribute,
    RestaurantById,
    ItemsByName,
    ItemsByAttribute,
    MenusContainingItems,
}

impl StoreCall {
    pub fn name(&self) -> &'static str {
        match self {
            StoreCall::AllRestaurants => "all_restaurants",
            StoreCall::RestaurantsByName => "find_restaurants_by_name_regex",
            StoreCall::RestaurantsByAttribute => "find_restaurants_by_attribute_regex",
            StoreCall::RestaurantById => "find_restaurant_by_id",
            StoreCall::ItemsByName => "find_menu_items_by_name_regex",
            StoreCall::ItemsByAttribute => "find_menu_items_by_attribute_regex",
            StoreCall::MenusContainingItems => "find_menus_containing_item_ids",
        }
    }
}

/// Implement [`RestaurantStore`] for a wrapper: await its `before` hook,
/// then forward to `inner`.
macro_rules! delegate_store {
    ($wrapper:ident) => {
        #[async_trait]
        impl<S: RestaurantStore> RestaurantStore for $wrapper<S> {
            async fn all_restaurants(&self) -> QeatsResult<Vec<RestaurantRecord>> {
                self.before(StoreCall::AllRestaurants).await?;
                self.inner.all_restaurants().await
            }

            async fn find_restaurants_by_name_regex(
                &self,
                pattern: &Regex,
            ) -> QeatsResult<Vec<RestaurantRecord>> {
                self.before(StoreCall::RestaurantsByName).await?;
                self.inner.find_restaurants_by_name_regex(pattern).await
            }

            async fn find_restaurants_by_attribute_regex(
                &self,
                pattern: &Regex,
            ) -> QeatsResult<Vec<RestaurantRecord>> {
                self.before(StoreCall::RestaurantsByAttribute).await?;
                self.inner.find_restaurants_by_attribute_regex(pattern).await
            }

            async fn find_restaurant_by_id(
                &self,
                id: &RestaurantId,
            ) -> QeatsResult<Option<RestaurantRecord>> {
                self.before(StoreCall::RestaurantById).await?;
                self.inner.find_restaurant_by_id(id).await
            }

            async fn find_menu_items_by_name_regex(
                &self,
                pattern: &Regex,
            ) -> QeatsResult<Vec<MenuItemRecord>> {
                self.before(StoreCall::ItemsByName).await?;
                self.inner.find_menu_items_by_name_regex(pattern).await
            }

            async fn find_menu_items_by_attribute_regex(
                &self,
                pattern: &Regex,
            ) -> QeatsResult<Vec<MenuItemRecord>> {
                self.before(StoreCall::ItemsByAttribute).await?;
                self.inner.find_menu_items_by_attribute_regex(pattern).await
            }

            async fn find_menus_containing_item_ids(
                &self,
                item_ids: &[ItemId],
            ) -> QeatsResult<Vec<MenuRecord>> {
                self.before(StoreCall::MenusContainingItems).await?;
                self.inner.find_menus_containing_item_ids(item_ids).await
            }
        }
    };
}

/// Sleeps before every store call to simulate network latency.
#[derive(Debug)]
pub struct DelayedStore<S> {
    inner: S,
    delay: Duration,
}

impl<S> DelayedStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }

    async fn before(&self, _call: StoreCall) -> QeatsResult<()> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

delegate_store!(DelayedStore);

/// How an injected failure manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Return `StoreError::QueryFailed`.
    Error,
    /// Panic inside the call.
    Panic,
    /// Never complete within any reasonable timeout.
    Hang,
}

/// Fails selected store calls; the rest pass through.
#[derive(Debug)]
pub struct FailingStore<S> {
    inner: S,
    failures: HashMap<StoreCall, FailureMode>,
}

impl<S> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failures: HashMap::new(),
        }
    }

    /// Make `call` fail with `mode`.
    pub fn fail(mut self, call: StoreCall, mode: FailureMode) -> Self {
        self.failures.insert(call, mode);
        self
    }

    /// Make every call fail with `mode`.
    pub fn fail_all(mut self, mode: FailureMode) -> Self {
        for call in [
            StoreCall::AllRestaurants,
            StoreCall::RestaurantsByName,
            StoreCall::RestaurantsByAttribute,
            StoreCall::RestaurantById,
            StoreCall::ItemsByName,
            StoreCall::ItemsByAttribute,
            StoreCall::MenusContainingItems,
        ] {
            self.failures.insert(call, mode);
        }
        self
    }

    async fn before(&self, call: StoreCall) -> QeatsResult<()> {
        match self.failures.get(&call) {
            None => Ok(()),
            Some(FailureMode::Error) => Err(StoreError::QueryFailed {
                query: call.name().to_string(),
                reason: "injected failure".to_string(),
            }
            .into()),
            Some(FailureMode::Panic) => panic!("injected panic in {}", call.name()),
            Some(FailureMode::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

delegate_store!(FailingStore);

/// Counts calls per store method.
#[derive(Debug)]
pub struct CountingStore<S> {
    inner: S,
    counts: Mutex<HashMap<StoreCall, usize>>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Number of times `call` was made.
    pub fn count(&self, call: StoreCall) -> usize {
        self.counts
            .lock()
            .map(|c| c.get(&call).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Number of calls across all methods.
    pub fn total(&self) -> usize {
        self.counts
            .lock()
            .map(|c| c.values().sum())
            .unwrap_or(0)
    }

    async fn before(&self, call: StoreCall) -> QeatsResult<()> {
        if let Ok(mut counts) = self.counts.lock() {
            *counts.entry(call).or_insert(0) += 1;
        }
        Ok(())
    }
}

delegate_store!(CountingStore);

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for QEats record types.

    use super::*;
    use chrono::NaiveTime;
    use proptest::prelude::*;

    /// Any valid coordinate.
    pub fn arb_coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(latitude, longitude)| Coordinate {
            latitude,
            longitude,
        })
    }

    /// A coordinate within roughly `span_deg` degrees of `center`.
    pub fn arb_coordinate_near(
        center: Coordinate,
        span_deg: f64,
    ) -> impl Strategy<Value = Coordinate> {
        (-span_deg..=span_deg, -span_deg..=span_deg).prop_map(move |(dlat, dlng)| Coordinate {
            latitude: (center.latitude + dlat).clamp(-90.0, 90.0),
            longitude: (center.longitude + dlng).clamp(-180.0, 180.0),
        })
    }

    /// Any time of day at second resolution.
    pub fn arb_time() -> impl Strategy<Value = NaiveTime> {
        (0u32..86_400).prop_map(|secs| {
            NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN)
        })
    }

    /// A restaurant near `center` with id `id`, random name, hours and
    /// cuisines drawn from a small vocabulary so that searches collide.
    pub fn arb_restaurant(
        id: usize,
        center: Coordinate,
    ) -> impl Strategy<Value = RestaurantRecord> {
        (
            prop::sample::select(vec!["Tamil", "Punjabi", "Chinese", "Udupi"]),
            arb_coordinate_near(center, 0.05),
            0u32..12,
            12u32..24,
            prop::collection::vec(
                prop::sample::select(vec!["Tamil", "South Indian", "North Indian"]),
                0..3,
            ),
        )
            .prop_map(move |(name, coordinate, opens, closes, cuisines)| {
                RestaurantRecord {
                    restaurant_id: RestaurantId::new(id.to_string()),
                    name: name.to_string(),
                    city: "Greater Noida".to_string(),
                    image_url: String::new(),
                    coordinate,
                    opens_at: NaiveTime::from_hms_opt(opens, 0, 0).unwrap_or(NaiveTime::MIN),
                    closes_at: NaiveTime::from_hms_opt(closes, 0, 0).unwrap_or(NaiveTime::MIN),
                    attributes: cuisines.into_iter().map(String::from).collect(),
                    menu_id: None,
                }
            })
    }

    /// Up to `max` restaurants near `center` with distinct ids.
    pub fn arb_restaurants(
        center: Coordinate,
        max: usize,
    ) -> impl Strategy<Value = Vec<RestaurantRecord>> {
        (0..=max).prop_flat_map(move |n| {
            (0..n)
                .map(|i| arb_restaurant(i, center))
                .collect::<Vec<_>>()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.
    //!
    //! The dataset is laid out due north of [`origin`] so distances are easy
    //! to reason about (0.009 degrees of latitude is roughly 1 km):
    //!
    //! | id | name            | distance | hours       | reaches "tamil" via        |
    //! |----|-----------------|----------|-------------|----------------------------|
    //! | 1  | Tamil           | 1.0 km   | 09:00-23:00 | name, item attribute       |
    //! | 2  | Chennai Express | 2.0 km   | 09:00-23:00 | cuisine, item name         |
    //! | 3  | Madurai Mess    | 4.0 km   | 09:00-23:00 | item attribute             |
    //! | 4  | tamil           | 0.6 km   | 18:00-23:00 | name (closed at lunch)     |
    //! | 5  | Tamil           | 20 km    | 09:00-23:00 | name (out of range)        |
    //! | 6  | Punjabi Dhaba   | 0.2 km   | 09:00-23:00 | none                       |
    //!
    //! Menu `m9` belongs to a restaurant that does not exist.

    use super::*;
    use chrono::NaiveTime;

    pub fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap_or(NaiveTime::MIN)
    }

    /// Request origin in Greater Noida.
    pub fn origin() -> Coordinate {
        Coordinate {
            latitude: 28.49,
            longitude: 77.53,
        }
    }

    /// 13:30, inside the lunch peak window.
    pub fn lunch_peak() -> NaiveTime {
        hms(13, 30, 0)
    }

    /// 16:00, outside every peak window.
    pub fn afternoon() -> NaiveTime {
        hms(16, 0, 0)
    }

    /// A restaurant `km_north` kilometres north of [`origin`].
    pub fn restaurant(
        id: &str,
        name: &str,
        km_north: f64,
        opens_at: NaiveTime,
        closes_at: NaiveTime,
        cuisines: &[&str],
    ) -> RestaurantRecord {
        RestaurantRecord {
            restaurant_id: RestaurantId::new(id),
            name: name.to_string(),
            city: "Greater Noida".to_string(),
            image_url: format!("https://img.qeats.example/{}.png", id),
            coordinate: Coordinate {
                latitude: origin().latitude + km_north * 0.008_993,
                longitude: origin().longitude,
            },
            opens_at,
            closes_at,
            attributes: cuisines.iter().map(|c| c.to_string()).collect(),
            menu_id: Some(MenuId::new(format!("m{}", id))),
        }
    }

    pub fn item(id: &str, name: &str, attributes: &[&str]) -> MenuItemRecord {
        MenuItemRecord {
            item_id: ItemId::new(id),
            name: name.to_string(),
            image_url: String::new(),
            price: 150.0,
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            menu_id: None,
        }
    }

    pub fn menu(id: &str, restaurant_id: &str, items: &[&str]) -> MenuRecord {
        MenuRecord {
            menu_id: MenuId::new(id),
            restaurant_id: RestaurantId::new(restaurant_id),
            items: items.iter().map(|i| ItemId::new(*i)).collect(),
        }
    }

    /// The dataset described in the module docs.
    pub fn scenario_dataset() -> Dataset {
        let day = (hms(9, 0, 0), hms(23, 0, 0));
        Dataset {
            restaurants: vec![
                restaurant("1", "Tamil", 1.0, day.0, day.1, &["South Indian"]),
                restaurant("2", "Chennai Express", 2.0, day.0, day.1, &["Tamil"]),
                restaurant("3", "Madurai Mess", 4.0, day.0, day.1, &["South Indian"]),
                restaurant("4", "tamil", 0.6, hms(18, 0, 0), day.1, &[]),
                restaurant("5", "Tamil", 20.0, day.0, day.1, &[]),
                restaurant("6", "Punjabi Dhaba", 0.2, day.0, day.1, &["North Indian"]),
            ],
            menus: vec![
                menu("m1", "1", &["i1"]),
                menu("m2", "2", &["i2"]),
                menu("m3", "3", &["i3"]),
                menu("m6", "6", &["i6"]),
                menu("m9", "ghost", &["i9"]),
            ],
            items: vec![
                item("i1", "Masala Dosa", &["Tamil Special"]),
                item("i2", "Tamil Thali", &["vegetarian"]),
                item("i3", "Kothu Parotta", &["Tamil Nadu"]),
                item("i6", "Butter Chicken", &["spicy"]),
                item("i9", "Tamil Biryani", &[]),
            ],
        }
    }

    /// An [`InMemoryStore`] holding [`scenario_dataset`].
    pub fn scenario_store() -> InMemoryStore {
        InMemoryStore::from_dataset(scenario_dataset()).expect("fresh store is never poisoned")
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over restaurant result lists.

    use super::*;
    use std::collections::HashSet;

    /// Restaurant ids in result order.
    pub fn ids(restaurants: &[RestaurantRecord]) -> Vec<&str> {
        restaurants
            .iter()
            .map(|r| r.restaurant_id.as_str())
            .collect()
    }

    /// Assert that no restaurant id appears twice.
    #[track_caller]
    pub fn assert_unique_ids(restaurants: &[RestaurantRecord]) {
        let mut seen = HashSet::new();
        for r in restaurants {
            assert!(
                seen.insert(&r.restaurant_id),
                "Duplicate restaurant id {} in {:?}",
                r.restaurant_id,
                ids(restaurants)
            );
        }
    }

    /// Assert that a QeatsResult is a Store error.
    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &QeatsResult<T>) {
        match result {
            Err(QeatsError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Assert that a QeatsResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &QeatsResult<T>) {
        match result {
            Err(QeatsError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assertions::ids;
    use super::fixtures::*;
    use super::*;
    use qeats_core::distance_km;

    #[test]
    fn test_fixture_distances() {
        let dataset = scenario_dataset();
        let km: Vec<f64> = dataset
            .restaurants
            .iter()
            .map(|r| distance_km(origin(), r.coordinate))
            .collect();
        assert!((km[0] - 1.0).abs() < 0.01);
        assert!((km[1] - 2.0).abs() < 0.01);
        assert!((km[2] - 4.0).abs() < 0.02);
        assert!(km[4] > 19.0);
    }

    #[tokio::test]
    async fn test_counting_store_counts() {
        let store = CountingStore::new(scenario_store());
        let all = store.all_restaurants().await.unwrap();
        assert_eq!(ids(&all), vec!["1", "2", "3", "4", "5", "6"]);
        store.all_restaurants().await.unwrap();
        assert_eq!(store.count(StoreCall::AllRestaurants), 2);
        assert_eq!(store.count(StoreCall::ItemsByName), 0);
        assert_eq!(store.total(), 2);
    }

    #[tokio::test]
    async fn test_failing_store_fails_selected_calls() {
        let store =
            FailingStore::new(scenario_store()).fail(StoreCall::ItemsByName, FailureMode::Error);
        assert!(store.all_restaurants().await.is_ok());
        let pattern = Regex::new("(?i)tamil").unwrap();
        let err = store
            .find_menu_items_by_name_regex(&pattern)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_delayed_store_delays() {
        let store = DelayedStore::new(scenario_store(), Duration::from_millis(20));
        let start = std::time::Instant::now();
        store.all_restaurants().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
