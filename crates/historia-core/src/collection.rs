//! Collections: language- and workspace-scoped views over stored records
//!
//! A `Collection` is an immutable value: a name, a language, a workspace and
//! a shared [`Database`] handle. Narrowing with [`Collection::for_language`]
//! or [`Collection::for_workspace`] returns a new view over the same handle.
//!
//! ## Workspaces
//!
//! `default` is the base workspace. Every other workspace is a branch that
//! overlays `default` for the records it touches:
//!
//! - A branch read uses the branch row when there is one and falls through
//!   to `default` otherwise.
//! - Creating a record in a branch first anchors it in `default` with an
//!   empty `stub` row, so every branch row has a base counterpart.
//! - Deleting writes a `deleted` tombstone in the current workspace. In a
//!   branch this hides the base record without touching it.
//!
//! [`Collection::merge_workspace`] replays a branch onto `default` and then
//! clears the branch.
//!
//! ## Usage
//!
//! ```ignore
//! let db = Database::open_in_memory()?;
//! let collection = db.collection("articles")?;
//!
//! collection.save(Record::new("12345", "hello world"))?;
//!
//! let draft = collection.for_workspace("draft");
//! draft.save(Record::new("12345", "goodbye world"))?;
//!
//! collection.merge_workspace("draft")?;
//! assert_eq!(collection.load("12345")?.document, "goodbye world");
//! ```

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::commit::{Commit, CommitReceipt, RecordKey};
use crate::config::Config;
use crate::models::{Record, RecordFlag, DEFAULT_LANGUAGE, DEFAULT_WORKSPACE};
use crate::ordered_set::OrderedSet;
use crate::shelf::Shelf;
use crate::storage::audit::{self, Summary, TransactionEntry};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::rows::{self, WriteClock};
use crate::storage::schema::{documents_table, ensure_collection, transactions_table};
use crate::storage::Database;

/// Outcome of a workspace merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Transaction id, also the key of the audit entry when auditing is on
    pub id: Uuid,
    /// Records written into `default`
    pub merged: usize,
    /// Tombstones written into `default`
    pub deleted: usize,
}

/// A named, language- and workspace-scoped view over stored records
#[derive(Clone)]
pub struct Collection {
    database: Database,
    name: String,
    language: String,
    workspace: String,
    audit: bool,
}

impl Collection {
    /// Bind a collection to the database, creating its tables if needed
    ///
    /// The view starts in the default language and the default workspace,
    /// with auditing enabled.
    pub fn new(database: &Database, name: &str) -> StorageResult<Self> {
        database.with_connection(|conn| ensure_collection(conn, name))?;

        Ok(Self {
            database: database.clone(),
            name: name.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            workspace: DEFAULT_WORKSPACE.to_string(),
            audit: true,
        })
    }

    /// Bind a collection using the configured language and audit setting
    pub fn with_config(database: &Database, name: &str, config: &Config) -> StorageResult<Self> {
        let collection = Self::new(database, name)?
            .for_language(&config.default_language)
            .with_audit(config.audit);
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn is_default_workspace(&self) -> bool {
        self.workspace == DEFAULT_WORKSPACE
    }

    /// A view of the same collection in another language
    pub fn for_language(&self, language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..self.clone()
        }
    }

    /// A view of the same collection through another workspace
    pub fn for_workspace(&self, workspace: &str) -> Self {
        Self {
            workspace: workspace.to_string(),
            ..self.clone()
        }
    }

    /// A view that does or does not write audit entries
    pub fn with_audit(&self, enabled: bool) -> Self {
        Self {
            audit: enabled,
            ..self.clone()
        }
    }

    /// Mint a new, unsaved record in this view's language
    pub fn create(&self, shelf: &impl Shelf) -> Record {
        shelf.create(&self.language)
    }

    pub fn new_commit(&self) -> Commit {
        Commit::new()
    }

    // ==================== Reads ====================

    /// Load one record through this view
    pub fn load(&self, uuid: &str) -> StorageResult<Record> {
        self.load_multiple(&[uuid])?
            .into_iter()
            .next()
            .map(|(_, record)| record)
            .ok_or_else(|| StorageError::not_found(uuid, &self.language))
    }

    /// Load several records, keyed by uuid, in the order requested
    ///
    /// Uuids that don't resolve to a visible record are left out.
    pub fn load_multiple<S: AsRef<str>>(
        &self,
        uuids: &[S],
    ) -> StorageResult<OrderedSet<String, Record>> {
        if uuids.is_empty() {
            return Ok(OrderedSet::default());
        }

        let requested: Vec<String> = uuids.iter().map(|u| u.as_ref().to_string()).collect();
        let table = self.documents_table();

        let records = self.database.with_connection(|conn| {
            if self.is_default_workspace() {
                rows::select_default(conn, &table, &self.language, &requested)
            } else {
                rows::select_branch(conn, &table, &self.workspace, &self.language, &requested)
            }
        })?;

        let order: Vec<&str> = requested.iter().map(String::as_str).collect();
        Ok(OrderedSet::new(
            records.into_iter().map(|r| (r.uuid.clone(), r)),
            &order,
        ))
    }

    /// Every record visible through this view, ordered by uuid
    pub fn list(&self) -> StorageResult<Vec<Record>> {
        let table = self.documents_table();
        self.database
            .with_connection(|conn| rows::select_all(conn, &table, &self.workspace, &self.language))
    }

    // ==================== Writes ====================

    /// Save a single record
    pub fn save(&self, record: Record) -> StorageResult<CommitReceipt> {
        let mut commit = self.new_commit();
        commit.add(record);
        self.commit(commit)
    }

    /// Apply a commit to this view's workspace in one transaction
    ///
    /// Adds are written first, in order, then deletes. If any statement
    /// fails nothing from the commit is kept.
    pub fn commit(&self, commit: Commit) -> StorageResult<CommitReceipt> {
        let id = Uuid::new_v4();
        let table = self.documents_table();

        self.database.transaction(|tx| {
            let mut clock = WriteClock::resume(tx, &table, &self.transactions_table())?;

            for record in commit.adds() {
                // The stub must be older than the branch row it anchors
                if !self.is_default_workspace()
                    && rows::ensure_stub(tx, &table, &record.uuid, &record.language, clock.tick())?
                {
                    debug!("Anchored {} ({}) in default workspace", record.uuid, record.language);
                }
                rows::upsert_row(
                    tx,
                    &table,
                    &record.uuid,
                    &record.language,
                    &self.workspace,
                    &record.document,
                    clock.tick(),
                    RecordFlag::Normal,
                )?;
            }

            for key in commit.deletes() {
                if !self.is_default_workspace()
                    && rows::ensure_stub(tx, &table, &key.uuid, &key.language, clock.tick())?
                {
                    debug!("Anchored {} ({}) in default workspace", key.uuid, key.language);
                }
                rows::upsert_row(
                    tx,
                    &table,
                    &key.uuid,
                    &key.language,
                    &self.workspace,
                    "",
                    clock.tick(),
                    RecordFlag::Deleted,
                )?;
            }

            if self.audit {
                let summary = Summary {
                    merged_from: None,
                    added: commit.adds().iter().map(RecordKey::from).collect(),
                    deleted: commit.deletes().to_vec(),
                };
                audit::record_transaction(
                    tx,
                    &self.transactions_table(),
                    &id,
                    &self.workspace,
                    commit.author(),
                    commit.message(),
                    &summary,
                    clock.tick(),
                )?;
            }

            Ok(())
        })?;

        info!(
            "Committed {} to {}/{}: {} added, {} deleted",
            id,
            self.name,
            self.workspace,
            commit.adds().len(),
            commit.deletes().len()
        );

        Ok(CommitReceipt {
            id,
            added: commit.adds().len(),
            deleted: commit.deletes().len(),
        })
    }

    /// Fold a branch into the default workspace, then clear the branch
    ///
    /// Every language in the branch is merged. `normal` rows overwrite the
    /// base record and `deleted` rows become tombstones in `default`. On
    /// failure neither workspace changes.
    pub fn merge_workspace(&self, branch: &str) -> StorageResult<MergeSummary> {
        if branch == DEFAULT_WORKSPACE {
            return Err(StorageError::InvalidWorkspace {
                name: branch.to_string(),
                reason: "the default workspace cannot be merged into itself",
            });
        }

        let id = Uuid::new_v4();
        let table = self.documents_table();

        let summary = self.database.transaction(|tx| {
            let mut clock = WriteClock::resume(tx, &table, &self.transactions_table())?;
            let mut summary = MergeSummary {
                id,
                merged: 0,
                deleted: 0,
            };
            let mut log = Summary {
                merged_from: Some(branch),
                ..Summary::default()
            };

            for row in rows::workspace_rows(tx, &table, branch)? {
                let (document, list) = match row.flag {
                    RecordFlag::Normal => {
                        summary.merged += 1;
                        (row.document.as_str(), &mut log.added)
                    }
                    RecordFlag::Deleted => {
                        summary.deleted += 1;
                        ("", &mut log.deleted)
                    }
                    RecordFlag::Stub => continue,
                };
                rows::upsert_row(
                    tx,
                    &table,
                    &row.uuid,
                    &row.language,
                    DEFAULT_WORKSPACE,
                    document,
                    clock.tick(),
                    row.flag,
                )?;
                list.push(RecordKey {
                    uuid: row.uuid.clone(),
                    language: row.language.clone(),
                });
            }

            let cleared = rows::clear_workspace(tx, &table, branch)?;
            debug!("Cleared {} row(s) from workspace {}", cleared, branch);

            if self.audit {
                let message = format!("Merge workspace {}", branch);
                audit::record_transaction(
                    tx,
                    &self.transactions_table(),
                    &id,
                    DEFAULT_WORKSPACE,
                    None,
                    Some(&message),
                    &log,
                    clock.tick(),
                )?;
            }

            Ok(summary)
        })?;

        info!(
            "Merged workspace {} into {}/{}: {} merged, {} deleted",
            branch, self.name, DEFAULT_WORKSPACE, summary.merged, summary.deleted
        );

        Ok(summary)
    }

    // ==================== Audit ====================

    /// Most recent audit entries, newest first
    pub fn transactions(&self, limit: usize) -> StorageResult<Vec<TransactionEntry>> {
        let table = self.transactions_table();
        self.database
            .with_connection(|conn| audit::recent_transactions(conn, &table, limit))
    }

    fn documents_table(&self) -> String {
        documents_table(&self.name)
    }

    fn transactions_table(&self) -> String {
        transactions_table(&self.name)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("workspace", &self.workspace)
            .field("audit", &self.audit)
            .finish()
    }
}
