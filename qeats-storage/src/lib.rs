//! QEats Storage - Store Trait, In-Memory Store and Proximity Cache
//!
//! Defines the read-only store abstraction the discovery engine queries,
//! an in-memory implementation loaded from JSON fixtures, and the cache
//! layer that memoizes proximity scans.

pub mod cache;

pub use cache::{
    scan_eligible, CacheBackend, CacheRead, CacheStats, InMemoryCacheBackend, LmdbCacheBackend,
    LmdbCacheError, NullCacheBackend, ProximityCache, ReadSource,
};

use async_trait::async_trait;
use qeats_core::{
    ItemId, MenuId, MenuItemRecord, MenuRecord, QeatsResult, RestaurantId, RestaurantRecord,
    StoreError,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Read-only queries over restaurants, menus and menu items.
///
/// Regex lookups return every record whose field matches; callers decide
/// anchoring and case sensitivity through the pattern itself.
#[async_trait]
pub trait RestaurantStore: Send + Sync {
    /// Every restaurant in the store.
    async fn all_restaurants(&self) -> QeatsResult<Vec<RestaurantRecord>>;

    /// Restaurants whose name matches `pattern`.
    async fn find_restaurants_by_name_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<RestaurantRecord>>;

    /// Restaurants with at least one cuisine matching `pattern`.
    async fn find_restaurants_by_attribute_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<RestaurantRecord>>;

    /// A single restaurant, or `None` if the id is unknown.
    async fn find_restaurant_by_id(
        &self,
        id: &RestaurantId,
    ) -> QeatsResult<Option<RestaurantRecord>>;

    /// Menu items whose name matches `pattern`.
    async fn find_menu_items_by_name_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<MenuItemRecord>>;

    /// Menu items with at least one attribute matching `pattern`.
    async fn find_menu_items_by_attribute_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<MenuItemRecord>>;

    /// Menus listing any of `item_ids`.
    async fn find_menus_containing_item_ids(
        &self,
        item_ids: &[ItemId],
    ) -> QeatsResult<Vec<MenuRecord>>;
}

// ============================================================================
// DATASET
// ============================================================================

/// JSON fixture format accepted by [`InMemoryStore::load_json`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub restaurants: Vec<RestaurantRecord>,
    #[serde(default)]
    pub menus: Vec<MenuRecord>,
    #[serde(default)]
    pub items: Vec<MenuItemRecord>,
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory store backed by ordered maps.
///
/// Iteration follows id order, so every query is deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    restaurants: RwLock<BTreeMap<RestaurantId, RestaurantRecord>>,
    menus: RwLock<BTreeMap<MenuId, MenuRecord>>,
    items: RwLock<BTreeMap<ItemId, MenuItemRecord>>,
}

fn read<T>(lock: &RwLock<T>) -> QeatsResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned.into())
}

fn write<T>(lock: &RwLock<T>) -> QeatsResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned.into())
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding every record in `dataset`.
    pub fn from_dataset(dataset: Dataset) -> QeatsResult<Self> {
        let store = Self::new();
        for restaurant in dataset.restaurants {
            store.insert_restaurant(restaurant)?;
        }
        for menu in dataset.menus {
            store.insert_menu(menu)?;
        }
        for item in dataset.items {
            store.insert_item(item)?;
        }
        Ok(store)
    }

    /// Read a [`Dataset`] JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> QeatsResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| StoreError::Unavailable {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| StoreError::QueryFailed {
            query: format!("load {}", path.display()),
            reason: e.to_string(),
        })?;
        Self::from_dataset(dataset)
    }

    /// Insert or replace a restaurant.
    pub fn insert_restaurant(&self, restaurant: RestaurantRecord) -> QeatsResult<()> {
        write(&self.restaurants)?.insert(restaurant.restaurant_id.clone(), restaurant);
        Ok(())
    }

    /// Insert or replace a menu.
    pub fn insert_menu(&self, menu: MenuRecord) -> QeatsResult<()> {
        write(&self.menus)?.insert(menu.menu_id.clone(), menu);
        Ok(())
    }

    /// Insert or replace a menu item.
    pub fn insert_item(&self, item: MenuItemRecord) -> QeatsResult<()> {
        write(&self.items)?.insert(item.item_id.clone(), item);
        Ok(())
    }

    pub fn restaurant_count(&self) -> QeatsResult<usize> {
        Ok(read(&self.restaurants)?.len())
    }

    fn restaurants_where(
        &self,
        predicate: impl Fn(&RestaurantRecord) -> bool,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        Ok(read(&self.restaurants)?
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    fn items_where(
        &self,
        predicate: impl Fn(&MenuItemRecord) -> bool,
    ) -> QeatsResult<Vec<MenuItemRecord>> {
        Ok(read(&self.items)?
            .values()
            .filter(|i| predicate(i))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RestaurantStore for InMemoryStore {
    async fn all_restaurants(&self) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_where(|_| true)
    }

    async fn find_restaurants_by_name_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_where(|r| pattern.is_match(&r.name))
    }

    async fn find_restaurants_by_attribute_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_where(|r| r.attributes.iter().any(|a| pattern.is_match(a)))
    }

    async fn find_restaurant_by_id(
        &self,
        id: &RestaurantId,
    ) -> QeatsResult<Option<RestaurantRecord>> {
        Ok(read(&self.restaurants)?.get(id).cloned())
    }

    async fn find_menu_items_by_name_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<MenuItemRecord>> {
        self.items_where(|i| pattern.is_match(&i.name))
    }

    async fn find_menu_items_by_attribute_regex(
        &self,
        pattern: &Regex,
    ) -> QeatsResult<Vec<MenuItemRecord>> {
        self.items_where(|i| i.attributes.iter().any(|a| pattern.is_match(a)))
    }

    async fn find_menus_containing_item_ids(
        &self,
        item_ids: &[ItemId],
    ) -> QeatsResult<Vec<MenuRecord>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(read(&self.menus)?
            .values()
            .filter(|m| m.contains_any(item_ids))
            .cloned()
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
