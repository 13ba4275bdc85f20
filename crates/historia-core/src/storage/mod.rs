//! Storage layer
//!
//! Handles the SQLite connection, schema, and the row-level statements
//! collections are built from.
//!
//! ## Tables
//!
//! - `schema_info` - schema version tracking
//! - `<collection>_documents` - rows keyed by `(uuid, language, workspace)`
//! - `<collection>_transactions` - advisory audit log (see [`audit`])

pub mod audit;
pub mod database;
pub mod error;
pub mod rows;
pub mod schema;

pub use audit::TransactionEntry;
pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use schema::{ensure_collection, init_schema, needs_init, SCHEMA_VERSION};
