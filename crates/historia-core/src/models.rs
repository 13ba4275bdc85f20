//! Data models for Historia
//!
//! Defines the record value handed to and returned from a collection, and
//! the flag stored alongside every persisted row.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language assigned to records and collections when none is given
pub const DEFAULT_LANGUAGE: &str = "en";

/// Name of the base workspace every branch falls through to
pub const DEFAULT_WORKSPACE: &str = "default";

/// A single document in one language
///
/// Identity within a collection is `(uuid, language)`. The document payload
/// is opaque to the store and replaced wholesale on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Unique identifier, shared across languages
    pub uuid: String,
    /// Language of this translation
    pub language: String,
    /// Document content
    pub document: String,
    /// When this record was last written
    pub updated: DateTime<Utc>,
}

impl Record {
    /// Create a record in the default language
    pub fn new(uuid: impl Into<String>, document: impl Into<String>) -> Self {
        Self::with_language(uuid, DEFAULT_LANGUAGE, document)
    }

    /// Create a record in a specific language
    pub fn with_language(
        uuid: impl Into<String>,
        language: impl Into<String>,
        document: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            language: language.into(),
            document: document.into(),
            updated: Utc::now(),
        }
    }

    /// Replace the document payload
    pub fn set_document(&mut self, document: impl Into<String>) {
        self.document = document.into();
        self.updated = Utc::now();
    }
}

/// State of a persisted row within its workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFlag {
    /// A visible record
    Normal,
    /// Empty anchor row in the default workspace for a branch-only record
    Stub,
    /// Tombstone: the record is absent when viewed through this workspace
    Deleted,
}

impl RecordFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordFlag::Normal => "normal",
            RecordFlag::Stub => "stub",
            RecordFlag::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(RecordFlag::Normal),
            "stub" => Some(RecordFlag::Stub),
            "deleted" => Some(RecordFlag::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for RecordFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RecordFlag {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecordFlag {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        RecordFlag::parse(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown record flag: {}", text).into())
        })
    }
}
