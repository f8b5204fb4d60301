//! Per-criterion restaurant searches.
//!
//! Each criterion answers "which eligible restaurants match this query?" from
//! a different angle. Restaurant-level criteria query restaurants directly;
//! item-level criteria find matching menu items and walk item -> menu ->
//! restaurant.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveTime;
use qeats_core::{
    is_eligible, Coordinate, ItemId, QeatsResult, RestaurantId, RestaurantRecord,
    ValidationError,
};
use qeats_storage::RestaurantStore;
use regex::Regex;
use tracing::debug;

/// A way of matching a query against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    /// Restaurant name equals the query, ignoring case.
    Name,
    /// Restaurant attribute lookup.
    Attribute,
    /// A menu item's name contains the query.
    ItemName,
    /// One of a menu item's attributes contains the query.
    ItemAttribute,
}

impl Criterion {
    /// Merge order: earlier criteria win when a restaurant matches several.
    pub const PRECEDENCE: [Criterion; 4] = [
        Criterion::Name,
        Criterion::Attribute,
        Criterion::ItemName,
        Criterion::ItemAttribute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Name => "name",
            Criterion::Attribute => "attribute",
            Criterion::ItemName => "item_name",
            Criterion::ItemAttribute => "item_attribute",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which restaurant field a restaurant-level lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestaurantMatchTarget {
    Name,
    Cuisine,
}

/// Which item field an item-level lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemMatchTarget {
    Name,
    Attribute,
}

/// Case-insensitive whole-string match of `query`.
pub fn exact_pattern(query: &str) -> QeatsResult<Regex> {
    compile(&format!("(?i)^{}$", regex::escape(query)))
}

/// Case-insensitive substring match of `query`.
pub fn partial_pattern(query: &str) -> QeatsResult<Regex> {
    compile(&format!("(?i){}", regex::escape(query)))
}

fn compile(pattern: &str) -> QeatsResult<Regex> {
    Regex::new(pattern).map_err(|e| {
        ValidationError::InvalidValue {
            field: "searchFor".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Drop repeated restaurant ids, keeping the first occurrence.
pub(crate) fn dedup_by_id(restaurants: Vec<RestaurantRecord>) -> Vec<RestaurantRecord> {
    let mut seen = HashSet::new();
    restaurants
        .into_iter()
        .filter(|r| seen.insert(r.restaurant_id.clone()))
        .collect()
}

/// Runs the individual criteria against a shared store.
pub struct CriteriaSearcher<S: ?Sized> {
    store: Arc<S>,
    match_cuisines: bool,
}

impl<S: ?Sized> Clone for CriteriaSearcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            match_cuisines: self.match_cuisines,
        }
    }
}

impl<S> CriteriaSearcher<S>
where
    S: RestaurantStore + ?Sized,
{
    /// `match_cuisines` points the attribute criterion at the cuisine list
    /// instead of the restaurant name.
    pub fn new(store: Arc<S>, match_cuisines: bool) -> Self {
        Self {
            store,
            match_cuisines,
        }
    }

    /// Run one criterion.
    pub async fn search(
        &self,
        criterion: Criterion,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        let found = match criterion {
            Criterion::Name => self.by_name(origin, query, time, radius_km).await?,
            Criterion::Attribute => self.by_attribute(origin, query, time, radius_km).await?,
            Criterion::ItemName => self.by_item_name(origin, query, time, radius_km).await?,
            Criterion::ItemAttribute => {
                self.by_item_attributes(origin, query, time, radius_km).await?
            }
        };
        debug!(criterion = %criterion, count = found.len(), "criterion finished");
        Ok(found)
    }

    pub async fn by_name(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_matching(RestaurantMatchTarget::Name, origin, query, time, radius_km)
            .await
    }

    /// Shares the name lookup unless cuisine matching is enabled.
    pub async fn by_attribute(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        let target = if self.match_cuisines {
            RestaurantMatchTarget::Cuisine
        } else {
            RestaurantMatchTarget::Name
        };
        self.restaurants_matching(target, origin, query, time, radius_km)
            .await
    }

    pub async fn by_item_name(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_serving(ItemMatchTarget::Name, origin, query, time, radius_km)
            .await
    }

    pub async fn by_item_attributes(
        &self,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        self.restaurants_serving(ItemMatchTarget::Attribute, origin, query, time, radius_km)
            .await
    }

    async fn restaurants_matching(
        &self,
        target: RestaurantMatchTarget,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        let pattern = exact_pattern(query)?;
        let candidates = match target {
            RestaurantMatchTarget::Name => {
                self.store.find_restaurants_by_name_regex(&pattern).await?
            }
            RestaurantMatchTarget::Cuisine => {
                self.store
                    .find_restaurants_by_attribute_regex(&pattern)
                    .await?
            }
        };
        Ok(dedup_by_id(
            candidates
                .into_iter()
                .filter(|r| is_eligible(r, origin, time, radius_km))
                .collect(),
        ))
    }

    async fn restaurants_serving(
        &self,
        target: ItemMatchTarget,
        origin: Coordinate,
        query: &str,
        time: NaiveTime,
        radius_km: f64,
    ) -> QeatsResult<Vec<RestaurantRecord>> {
        let pattern = partial_pattern(query)?;
        let items = match target {
            ItemMatchTarget::Name => self.store.find_menu_items_by_name_regex(&pattern).await?,
            ItemMatchTarget::Attribute => {
                self.store
                    .find_menu_items_by_attribute_regex(&pattern)
                    .await?
            }
        };
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<ItemId> = items.into_iter().map(|i| i.item_id).collect();
        let menus = self.store.find_menus_containing_item_ids(&item_ids).await?;

        let mut seen = HashSet::new();
        let restaurant_ids: Vec<RestaurantId> = menus
            .into_iter()
            .map(|m| m.restaurant_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut restaurants = Vec::with_capacity(restaurant_ids.len());
        for id in &restaurant_ids {
            // Menus can reference restaurants that no longer exist.
            if let Some(r) = self.store.find_restaurant_by_id(id).await? {
                if is_eligible(&r, origin, time, radius_km) {
                    restaurants.push(r);
                }
            }
        }
        Ok(restaurants)
    }
}
