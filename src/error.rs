//! Error types for jsonkv
//!
//! Provides a unified error type for all store operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// What a `NotFound` error failed to find
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    /// Storage key absent from the document
    Key { store: String, key: String },

    /// Column not declared in the store's schema
    Column { store: String, column: String },

    /// Value (or map key) absent during a remove-mode update
    ValueNotInList { column: String, value: String },
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFound::Key { store, key } => write!(f, "store: {} key: {}", store, key),
            NotFound::Column { store, column } => {
                write!(f, "store: {} column: {}", store, column)
            }
            NotFound::ValueNotInList { column, value } => {
                write!(f, "value {} not present in column {}", value, column)
            }
        }
    }
}

/// Why a share could not be created or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareRejection {
    /// Owner already holds the maximum number of shares
    QuotaExceeded,

    /// Upload larger than the per-transfer limit
    TooLarge,

    /// Not enough room left in the storage budget
    StorageFull,

    /// Every share code is taken
    CodesExhausted,

    /// Caller does not own the share
    NotOwner,
}

impl fmt::Display for ShareRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ShareRejection::QuotaExceeded => "share quota exceeded",
            ShareRejection::TooLarge => "file too large",
            ShareRejection::StorageFull => "not enough storage left",
            ShareRejection::CodesExhausted => "no share code available",
            ShareRejection::NotOwner => "not the owner of this share",
        };
        f.write_str(reason)
    }
}

/// Unified error type for jsonkv operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(NotFound),

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("Row rejected by store {store}: column {column} has no valid value")]
    SchemaCoercionRejected { store: String, column: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // -------------------------------------------------------------------------
    // Document Errors
    // -------------------------------------------------------------------------
    #[error("Failed to parse document {}: {reason}", path.display())]
    ParseFailure { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Update / Key Errors
    // -------------------------------------------------------------------------
    #[error("Invalid update mode: append and remove are mutually exclusive")]
    InvalidUpdateMode,

    #[error("Invalid key policy: {0}")]
    InvalidKeyPolicy(String),

    #[error("Key attribute missing from entity: {0}")]
    MissingKeyAttribute(String),

    // -------------------------------------------------------------------------
    // Share Errors
    // -------------------------------------------------------------------------
    #[error("Share rejected: {0}")]
    ShareRejected(ShareRejection),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn key_not_found(store: &str, key: &str) -> Self {
        StoreError::NotFound(NotFound::Key {
            store: store.to_string(),
            key: key.to_string(),
        })
    }

    pub(crate) fn column_not_found(store: &str, column: &str) -> Self {
        StoreError::NotFound(NotFound::Column {
            store: store.to_string(),
            column: column.to_string(),
        })
    }

    /// True for any `NotFound` variant
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
