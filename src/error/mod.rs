//! # Error Module
//!
//! Error types for the photo history graph.
//!
//! ## Design Principles
//! - **Graphs never fail** - malformed history degrades the result, it is not an error
//! - **Storage and scanning fail loudly** - with the path or item involved
//! - **Recovery hints** - suggest how to fix when possible

use crate::core::history::ItemId;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum HistoryGraphError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("History scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Failed to read catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised by history store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open history database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("History database corruption detected at {path}. Delete this file and import again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to serialize image history: {0}")]
    SerializationFailed(String),

    #[error("Unknown item: {id}")]
    UnknownItem { id: ItemId },

    #[error("Unknown internal tag: {0}")]
    UnknownTag(String),
}

/// Errors raised while scanning image histories
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to resolve history of item {id}: {source}")]
    Resolve {
        id: ItemId,
        #[source]
        source: StoreError,
    },

    #[error("Failed to tag history graph of item {id}: {source}")]
    Tag {
        id: ItemId,
        #[source]
        source: StoreError,
    },

    #[error("History scan was cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::QueryFailed(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::SerializationFailed(error.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, HistoryGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_includes_path() {
        let error = StoreError::OpenFailed {
            path: PathBuf::from("/library/history.db"),
            reason: "permission denied".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/library/history.db"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn scan_error_includes_item() {
        let error = ScanError::Resolve {
            id: 42,
            source: StoreError::QueryFailed("disk I/O error".to_string()),
        };
        let message = error.to_string();
        assert!(message.contains("42"));
        assert!(message.contains("disk I/O error"));
    }

    #[test]
    fn corruption_suggests_recovery() {
        let error = StoreError::Corrupted {
            path: PathBuf::from("/library/history.db"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn store_error_converts_to_top_level() {
        let error: HistoryGraphError = StoreError::UnknownItem { id: 7 }.into();
        assert!(matches!(error, HistoryGraphError::Store(StoreError::UnknownItem { id: 7 })));
    }
}
