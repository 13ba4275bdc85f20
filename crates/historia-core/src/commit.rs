//! A batch of changes submitted to a collection as one unit
//!
//! A `Commit` is a command object: it collects records to add or update and
//! identities to delete, then is handed to [`Collection::commit`] once.
//!
//! [`Collection::commit`]: crate::collection::Collection::commit

use serde::Serialize;
use uuid::Uuid;

use crate::models::Record;

/// Identity of a record within a collection: `(uuid, language)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordKey {
    pub uuid: String,
    pub language: String,
}

impl From<&Record> for RecordKey {
    fn from(record: &Record) -> Self {
        RecordKey {
            uuid: record.uuid.clone(),
            language: record.language.clone(),
        }
    }
}

/// Pending adds and deletes, applied in the order they were appended
#[derive(Debug, Clone, Default)]
pub struct Commit {
    author: Option<String>,
    message: Option<String>,
    adds: Vec<Record>,
    deletes: Vec<RecordKey>,
}

impl Commit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the author
    ///
    /// Domain-specific: a username, an email address, or the uuid of
    /// another record.
    pub fn set_author(&mut self, author: impl Into<String>) -> &mut Self {
        self.author = Some(author.into());
        self
    }

    /// Set the commit message
    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    /// Queue a record to add, or to replace the stored one
    pub fn add(&mut self, record: Record) -> &mut Self {
        self.adds.push(record);
        self
    }

    /// Queue a record identity for deletion
    pub fn delete(&mut self, uuid: impl Into<String>, language: impl Into<String>) -> &mut Self {
        self.deletes.push(RecordKey {
            uuid: uuid.into(),
            language: language.into(),
        });
        self
    }

    pub fn adds(&self) -> &[Record] {
        &self.adds
    }

    pub fn deletes(&self) -> &[RecordKey] {
        &self.deletes
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Number of records queued for adding
    pub fn len(&self) -> usize {
        self.adds.len()
    }

    /// True when there is nothing to add and nothing to delete
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty()
    }
}

/// Outcome of an applied commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    /// Transaction id, also the key of the audit entry when auditing is on
    pub id: Uuid,
    pub added: usize,
    pub deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_commit_is_empty() {
        let commit = Commit::new();
        assert!(commit.is_empty());
        assert_eq!(commit.len(), 0);
        assert!(commit.author().is_none());
        assert!(commit.message().is_none());
    }

    #[test]
    fn test_fluent_chaining_keeps_order() {
        let mut commit = Commit::new();
        commit
            .set_author("crell")
            .set_message("first draft")
            .add(Record::new("1", "one"))
            .delete("9", "en")
            .add(Record::new("2", "two"))
            .delete("8", "fr");

        assert_eq!(commit.len(), 2);
        let uuids: Vec<&str> = commit.adds().iter().map(|r| r.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["1", "2"]);
        assert_eq!(
            commit.deletes(),
            &[
                RecordKey {
                    uuid: "9".to_string(),
                    language: "en".to_string()
                },
                RecordKey {
                    uuid: "8".to_string(),
                    language: "fr".to_string()
                },
            ]
        );
        assert_eq!(commit.author(), Some("crell"));
        assert_eq!(commit.message(), Some("first draft"));
    }

    #[test]
    fn test_len_counts_only_adds() {
        let mut commit = Commit::new();
        commit.delete("1", "en");

        assert_eq!(commit.len(), 0);
        assert!(!commit.is_empty());
    }
}
