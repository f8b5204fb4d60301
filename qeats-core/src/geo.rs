//! Distance and opening-hours predicates.
//!
//! These are the only filters applied to candidate restaurants, both on the
//! proximity path and on every search criterion.

use crate::{Coordinate, RestaurantRecord};
use chrono::NaiveTime;

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1.0 for antipodal points.
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_KM * c
}

/// Whether the restaurant is open at `time`.
///
/// Both ends of the opening interval are excluded. Intervals that wrap past
/// midnight (e.g. 18:00 to 02:00) are never open.
pub fn is_open_at(record: &RestaurantRecord, time: NaiveTime) -> bool {
    time > record.opens_at && time < record.closes_at
}

/// Whether the restaurant is open at `time` and strictly closer than
/// `radius_km` to `origin`.
pub fn is_eligible(
    record: &RestaurantRecord,
    origin: Coordinate,
    time: NaiveTime,
    radius_km: f64,
) -> bool {
    is_open_at(record, time) && distance_km(origin, record.coordinate) < radius_km
}
