//! Record types read from the backing store.

use crate::{ItemId, MenuId, QeatsResult, RestaurantId, ValidationError};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting values outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> QeatsResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidCoordinate {
                latitude,
                longitude,
                reason: "latitude must be within [-90, 90]".to_string(),
            }
            .into());
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidCoordinate {
                latitude,
                longitude,
                reason: "longitude must be within [-180, 180]".to_string(),
            }
            .into());
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A restaurant as stored in the backing store.
///
/// `opens_at` and `closes_at` are wall-clock times; a restaurant is open
/// strictly between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRecord {
    pub restaurant_id: RestaurantId,
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    /// Cuisines served, e.g. "Tamil", "South Indian".
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<MenuId>,
}

/// A single dish on a menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemRecord {
    pub item_id: ItemId,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: f64,
    /// Descriptive tags, e.g. "spicy", "vegetarian".
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_id: Option<MenuId>,
}

/// A restaurant's menu, referencing its items by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuRecord {
    pub menu_id: MenuId,
    pub restaurant_id: RestaurantId,
    #[serde(default)]
    pub items: Vec<ItemId>,
}

impl MenuRecord {
    /// Whether any of `item_ids` appears on this menu.
    pub fn contains_any(&self, item_ids: &[ItemId]) -> bool {
        self.items.iter().any(|item| item_ids.contains(item))
    }
}
