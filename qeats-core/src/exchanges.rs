//! Request and response shapes for the restaurant discovery API.

use crate::{Coordinate, QeatsResult, RestaurantRecord, ValidationError};
use serde::{Deserialize, Serialize};

/// Query parameters of a restaurant lookup, e.g.
/// `?latitude=28.4900591&longitude=77.536386&searchFor=tamil`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRestaurantsRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_for: Option<String>,
}

impl GetRestaurantsRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            search_for: None,
        }
    }

    pub fn with_search_for(mut self, query: impl Into<String>) -> Self {
        self.search_for = Some(query.into());
        self
    }

    /// Validate the location fields and return the origin coordinate.
    pub fn origin(&self) -> QeatsResult<Coordinate> {
        let latitude = self.latitude.ok_or_else(|| missing("latitude"))?;
        let longitude = self.longitude.ok_or_else(|| missing("longitude"))?;
        Coordinate::new(latitude, longitude)
    }

    /// The search query. An empty string is valid; an absent one is not.
    pub fn query(&self) -> QeatsResult<&str> {
        self.search_for
            .as_deref()
            .ok_or_else(|| missing("searchFor").into())
    }
}

fn missing(field: &str) -> ValidationError {
    ValidationError::RequiredFieldMissing {
        field: field.to_string(),
    }
}

/// Restaurants returned for a lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRestaurantsResponse {
    pub restaurants: Vec<RestaurantRecord>,
}

impl GetRestaurantsResponse {
    pub fn new(restaurants: Vec<RestaurantRecord>) -> Self {
        Self { restaurants }
    }
}
