//! Storage error handling
//!
//! Provides typed errors for collection operations. Data errors (missing
//! records, store failures) are kept apart from usage errors so callers can
//! tell a bad request from a bad store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No visible row resolves for the requested identity in this view
    #[error("No record found: {uuid} ({language})")]
    RecordNotFound { uuid: String, language: String },

    /// Attempt to modify a read-only result set
    #[error("Cannot {operation} documents in a read-only document set")]
    ReadOnly { operation: &'static str },

    /// Collection name cannot be used as a table prefix
    #[error("Invalid collection name '{name}': use letters, digits and underscores, starting with a letter")]
    InvalidName { name: String },

    /// Workspace cannot be used for the requested operation
    #[error("Invalid workspace '{name}': {reason}")]
    InvalidWorkspace { name: String, reason: &'static str },

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Audit summary could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another holder of the connection panicked
    #[error("Database connection lock poisoned")]
    LockPoisoned,

    /// Failed to create data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn not_found(uuid: impl Into<String>, language: impl Into<String>) -> Self {
        StorageError::RecordNotFound {
            uuid: uuid.into(),
            language: language.into(),
        }
    }

    /// Check if this error is a caller mistake rather than a data or store failure
    ///
    /// Usage errors fail the same way every time and must not be retried.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            StorageError::ReadOnly { .. }
                | StorageError::InvalidName { .. }
                | StorageError::InvalidWorkspace { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::RecordNotFound { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::RecordNotFound { .. } => {
                Some("Check the language and workspace of the view you are reading through.")
            }
            StorageError::InvalidName { .. } => {
                Some("Collection names become table prefixes; pick a plain identifier.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StorageError::not_found("12345", "fr");

        let msg = err.to_string();
        assert!(msg.contains("12345"));
        assert!(msg.contains("fr"));
        assert!(err.is_not_found());
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_usage_error_classification() {
        let read_only = StorageError::ReadOnly { operation: "set" };
        assert!(read_only.is_usage_error());
        assert!(read_only.to_string().contains("read-only"));

        let name = StorageError::InvalidName {
            name: "bad name".to_string(),
        };
        assert!(name.is_usage_error());
        assert!(name.recovery_suggestion().is_some());
    }

    #[test]
    fn test_database_error_is_not_usage_error() {
        let err = StorageError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_usage_error());
        assert!(err.to_string().starts_with("Database error"));
    }
}
