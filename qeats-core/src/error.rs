//! Error types for QEats discovery operations

use std::time::Duration;
use thiserror::Error;

/// Backing store errors.
///
/// These are transient from the caller's point of view: the request can be
/// retried once the store is reachable again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Query {query} failed: {reason}")]
    QueryFailed { query: String, reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Proximity cache errors. Never fatal to a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to serialize cache payload for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Failed to deserialize cache payload for {key}: {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },
}

/// Input validation errors, raised before any lookup is performed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid coordinate ({latitude}, {longitude}): {reason}")]
    InvalidCoordinate {
        latitude: f64,
        longitude: f64,
        reason: String,
    },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Errors from a single search criterion task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Criterion {criterion} timed out after {timeout:?}")]
    TaskTimedOut { criterion: String, timeout: Duration },

    #[error("Criterion {criterion} failed: {reason}")]
    TaskFailed { criterion: String, reason: String },
}

/// Master error type for all QEats errors.
#[derive(Debug, Clone, Error)]
pub enum QeatsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

impl QeatsError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            QeatsError::Store(StoreError::LockPoisoned) => false,
            QeatsError::Store(_) | QeatsError::Cache(_) | QeatsError::Search(_) => true,
            QeatsError::Validation(_) | QeatsError::Config(_) => false,
        }
    }

    /// Whether the error should be reported to the client as a bad request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, QeatsError::Validation(_))
    }
}

/// Result type alias for QEats operations.
pub type QeatsResult<T> = Result<T, QeatsError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_query_failed() {
        let err = StoreError::QueryFailed {
            query: "all_restaurants".to_string(),
            reason: "connection reset".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("all_restaurants"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_validation_error_display_invalid_coordinate() {
        let err = ValidationError::InvalidCoordinate {
            latitude: 91.0,
            longitude: 0.0,
            reason: "latitude out of range".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid coordinate"));
        assert!(msg.contains("91"));
    }

    #[test]
    fn test_search_error_display_timeout() {
        let err = SearchError::TaskTimedOut {
            criterion: "item_name".to_string(),
            timeout: Duration::from_millis(250),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("item_name"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_qeats_error_from_variants() {
        let store = QeatsError::from(StoreError::LockPoisoned);
        assert!(matches!(store, QeatsError::Store(_)));

        let cache = QeatsError::from(CacheError::Backend {
            reason: "mdb full".to_string(),
        });
        assert!(matches!(cache, QeatsError::Cache(_)));

        let validation = QeatsError::from(ValidationError::RequiredFieldMissing {
            field: "latitude".to_string(),
        });
        assert!(matches!(validation, QeatsError::Validation(_)));

        let config = QeatsError::from(ConfigError::Parse {
            reason: "bad toml".to_string(),
        });
        assert!(matches!(config, QeatsError::Config(_)));
    }

    #[test]
    fn test_retryable_classification() {
        let transient = QeatsError::from(StoreError::Unavailable {
            reason: "down".to_string(),
        });
        assert!(transient.is_retryable());
        assert!(!transient.is_client_error());

        let invalid = QeatsError::from(ValidationError::RequiredFieldMissing {
            field: "searchFor".to_string(),
        });
        assert!(!invalid.is_retryable());
        assert!(invalid.is_client_error());

        assert!(!QeatsError::from(StoreError::LockPoisoned).is_retryable());
    }
}
