//! Core error types for mealpromo-core.
//!
//! Only [`PromoError::UnknownMealBucket`] is allowed to cross the selector
//! boundary. Persistence and scroll failures are absorbed where they happen
//! and surface in logs only.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mealpromo-core.
#[derive(Error, Debug)]
pub enum PromoError {
    /// The meal bucket is not one of breakfast/lunch/snacks/dinner, or the
    /// catalog has no partition for it.
    #[error("Unknown meal bucket: {0}")]
    UnknownMealBucket(String),

    /// Persisted cache tier failed. Recovered locally as a cache miss.
    #[error("Cache persistence error: {0}")]
    CachePersistence(#[from] StoreError),

    /// A catalog file could not be read or parsed.
    #[error("Failed to load catalog from {path}: {message}")]
    Catalog { path: PathBuf, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database file
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,

    /// Record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Best-effort scroll-to-index failure reported by the host view.
///
/// Logged and ignored: the carousel index stays authoritative.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to scroll to index {index}: {reason}")]
pub struct ScrollError {
    pub index: usize,
    pub reason: String,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Result type alias for PromoError
pub type Result<T, E = PromoError> = std::result::Result<T, E>;
