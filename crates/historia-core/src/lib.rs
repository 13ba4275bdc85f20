//! Historia Core Library
//!
//! A versioned document store with per-language partitioning and git-like
//! workspace branching, backed by SQLite.
//!
//! # Architecture
//!
//! - **SQLite**: Source of truth. Each collection has a documents table keyed
//!   by `(uuid, language, workspace)` and an advisory transactions table.
//! - **Workspaces**: `default` is the published state; any other name is a
//!   branch that overlays it and can be merged back.
//!
//! All writes go through a [`Commit`], applied in a single transaction.
//!
//! # Quick Start
//!
//! ```text
//! let db = Database::open_in_memory()?;
//! let articles = db.collection("articles")?;
//!
//! articles.save(Record::new("12345", "hello world"))?;
//! let french = articles.for_language("fr");
//! french.save(Record::with_language("12345", "fr", "bonjour monde"))?;
//!
//! let record = articles.load("12345")?;
//! ```
//!
//! # Modules
//!
//! - `collection`: Scoped views, read resolution, commits and merges (main entry point)
//! - `commit`: Batches of pending changes
//! - `models`: Records and row flags
//! - `ordered_set`: Read-only result set in requested order
//! - `shelf`: Record factories that mint UUIDs
//! - `storage`: SQLite handle, schema, row statements and audit log
//! - `config`: Application configuration

pub mod collection;
pub mod commit;
pub mod config;
pub mod models;
pub mod ordered_set;
pub mod shelf;
pub mod storage;

pub use collection::{Collection, MergeSummary};
pub use commit::{Commit, CommitReceipt, RecordKey};
pub use config::Config;
pub use models::{Record, RecordFlag, DEFAULT_LANGUAGE, DEFAULT_WORKSPACE};
pub use ordered_set::OrderedSet;
pub use shelf::{Shelf, TextShelf};
pub use storage::{Database, StorageError, StorageResult, TransactionEntry};
