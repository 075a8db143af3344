//! Error types for AppDeck operations

use crate::EntityKind;
use std::time::Duration;
use thiserror::Error;

/// Primary store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} with {field} '{value}' already exists")]
    AlreadyExists {
        entity: EntityKind,
        field: String,
        value: String,
    },

    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: EntityKind, reason: String },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field {field} must be between {min} and {max} characters")]
    LengthOutOfRange { field: String, min: usize, max: usize },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Cache backend errors.
///
/// These never reach a caller of the coordinator; they are logged and the
/// operation degrades to a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Cache operation {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Cache backend error: {reason}")]
    Backend { reason: String },

    #[error("Cache payload could not be encoded or decoded: {reason}")]
    Serialization { reason: String },
}

/// Master error type for all AppDeck errors.
#[derive(Debug, Clone, Error)]
pub enum AppdeckError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for AppDeck operations.
pub type AppdeckResult<T> = Result<T, AppdeckError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity: EntityKind::Application,
            id: "42".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("application"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_storage_error_display_already_exists() {
        let err = StorageError::AlreadyExists {
            entity: EntityKind::User,
            field: "username".to_string(),
            value: "alice".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("username"));
        assert!(msg.contains("alice"));
    }

    #[test]
    fn test_config_error_display_missing() {
        let err = ConfigError::MissingRequired {
            field: "APPDECK_JWT_SECRET".to_string(),
        };
        assert!(format!("{}", err).contains("APPDECK_JWT_SECRET"));
    }

    #[test]
    fn test_cache_error_display_timeout() {
        let err = CacheError::Timeout {
            operation: "get",
            timeout: Duration::from_secs(2),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("get"));
        assert!(msg.contains("2s"));
    }

    #[test]
    fn test_appdeck_error_from_variants() {
        let storage = AppdeckError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, AppdeckError::Storage(_)));

        let validation = AppdeckError::from(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
        assert!(matches!(validation, AppdeckError::Validation(_)));

        let config = AppdeckError::from(ConfigError::MissingRequired {
            field: "secret".to_string(),
        });
        assert!(matches!(config, AppdeckError::Config(_)));

        let cache = AppdeckError::from(CacheError::Backend {
            reason: "refused".to_string(),
        });
        assert!(matches!(cache, AppdeckError::Cache(_)));
    }
}
