//! Geohash-based spatial keys for the proximity cache.
//!
//! A [`SpatialKey`] names a geohash cell. Two coordinates share a key iff
//! they fall in the same cell at the keyer's precision, so nearby points
//! across a cell boundary get different keys.

use crate::{ConfigError, Coordinate, QeatsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision used when none is configured (cells of about ±76 m).
pub const DEFAULT_PRECISION: usize = 7;

/// Longest geohash we produce. Beyond 12 characters the cells are smaller
/// than f64 coordinates can meaningfully distinguish.
pub const MAX_PRECISION: usize = 12;

/// Encode a coordinate as a base-32 geohash of `precision` characters.
///
/// `precision` is clamped to `1..=MAX_PRECISION`.
pub fn encode(coord: Coordinate, precision: usize) -> String {
    let precision = precision.clamp(1, MAX_PRECISION);
    let mut lat_range = (-90.0f64, 90.0f64);
    let mut lng_range = (-180.0f64, 180.0f64);
    let mut hash = String::with_capacity(precision);

    let mut even_bit = true;
    let mut bits = 0u8;
    let mut index = 0usize;

    while hash.len() < precision {
        let (range, value) = if even_bit {
            (&mut lng_range, coord.longitude)
        } else {
            (&mut lat_range, coord.latitude)
        };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            index = (index << 1) | 1;
            range.0 = mid;
        } else {
            index <<= 1;
            range.1 = mid;
        }
        even_bit = !even_bit;

        bits += 1;
        if bits == 5 {
            hash.push(BASE32[index] as char);
            bits = 0;
            index = 0;
        }
    }

    hash
}

/// Cache partition key derived from a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpatialKey(String);

impl SpatialKey {
    /// Borrow the geohash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of geohash characters in this key.
    pub fn precision(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives [`SpatialKey`]s at a precision fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialKeyer {
    precision: usize,
}

impl SpatialKeyer {
    /// Create a keyer. Fails if `precision` is outside `1..=MAX_PRECISION`.
    pub fn new(precision: usize) -> QeatsResult<Self> {
        if precision == 0 || precision > MAX_PRECISION {
            return Err(ConfigError::InvalidValue {
                field: "geohash_precision".to_string(),
                value: precision.to_string(),
                reason: format!("precision must be between 1 and {}", MAX_PRECISION),
            }
            .into());
        }
        Ok(Self { precision })
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Key for the cell containing `coord`.
    pub fn key_for(&self, coord: Coordinate) -> SpatialKey {
        SpatialKey(encode(coord, self.precision))
    }
}

impl Default for SpatialKeyer {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_encode_reference_points() {
        assert_eq!(encode(coord(57.64911, 10.40744), 11), "u4pruydqqvj");
        assert_eq!(encode(coord(42.6, -5.6), 5), "ezs42");
    }

    #[test]
    fn test_encode_prefix_property() {
        let c = coord(28.49, 77.53);
        let long = encode(c, 9);
        let short = encode(c, 7);
        assert!(long.starts_with(&short));
    }

    #[test]
    fn test_keyer_default_precision_is_seven() {
        let key = SpatialKeyer::default().key_for(coord(28.49, 77.53));
        assert_eq!(key.precision(), 7);
    }

    #[test]
    fn test_keyer_rejects_bad_precision() {
        assert!(SpatialKeyer::new(0).is_err());
        assert!(SpatialKeyer::new(13).is_err());
        assert!(SpatialKeyer::new(12).is_ok());
    }

    #[test]
    fn test_nearby_points_share_a_cell() {
        let keyer = SpatialKeyer::default();
        // A few metres apart, well inside one ~150m cell.
        let a = keyer.key_for(coord(57.649110, 10.407440));
        let b = keyer.key_for(coord(57.649120, 10.407450));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distant_points_differ() {
        let keyer = SpatialKeyer::default();
        let a = keyer.key_for(coord(28.49, 77.53));
        let b = keyer.key_for(coord(28.50, 77.53));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
            let keyer = SpatialKeyer::default();
            prop_assert_eq!(keyer.key_for(coord(lat, lng)), keyer.key_for(coord(lat, lng)));
        }

        #[test]
        fn prop_key_uses_base32_alphabet(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0, p in 1usize..=12) {
            let hash = encode(coord(lat, lng), p);
            prop_assert_eq!(hash.len(), p);
            prop_assert!(hash.bytes().all(|b| BASE32.contains(&b)));
        }
    }
}
