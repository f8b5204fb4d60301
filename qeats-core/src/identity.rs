//! Identity types for QEats records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a string-backed identifier newtype.
///
/// Store identifiers are opaque strings (the backing store assigns them), so
/// each record kind gets its own wrapper to keep restaurant, menu and item ids
/// from being mixed up at call sites.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a restaurant record.
    RestaurantId
);
string_id!(
    /// Identifier of a menu record.
    MenuId
);
string_id!(
    /// Identifier of a menu item record.
    ItemId
);
