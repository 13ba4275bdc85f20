//! SQLite schema for collections
//!
//! Every collection owns two tables, prefixed with the collection name:
//!
//! - `<name>_documents` - one row per `(uuid, language, workspace)`
//! - `<name>_transactions` - advisory audit log, one row per commit or merge
//!
//! SQLite has no system-versioned tables, so row history beyond stubs and
//! tombstones is not kept.

use rusqlite::{Connection, Result};

use crate::storage::error::{StorageError, StorageResult};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the shared schema tables
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Create the tables for a collection if they don't exist yet
pub fn ensure_collection(conn: &Connection, name: &str) -> StorageResult<()> {
    validate_collection_name(name)?;

    let documents = documents_table(name);
    let transactions = transactions_table(name);

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {documents} (
            uuid TEXT NOT NULL,
            language TEXT NOT NULL,
            workspace TEXT NOT NULL,
            document TEXT NOT NULL DEFAULT '',
            updated INTEGER NOT NULL,
            flag TEXT NOT NULL,
            PRIMARY KEY (uuid, language, workspace)
        );

        CREATE INDEX IF NOT EXISTS idx_{documents}_flag ON {documents}(flag);

        -- Branch reads join on (uuid, language) inside one workspace
        CREATE INDEX IF NOT EXISTS idx_{documents}_workspace
            ON {documents}(workspace, language, uuid);

        CREATE TABLE IF NOT EXISTS {transactions} (
            txn_id TEXT PRIMARY KEY,
            workspace TEXT NOT NULL,
            author TEXT,
            message TEXT,
            summary TEXT NOT NULL,
            created INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_{transactions}_created ON {transactions}(created);
        "#
    ))?;

    Ok(())
}

/// Reject names that are unsafe to splice into SQL as a table prefix
pub fn validate_collection_name(name: &str) -> StorageResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName {
            name: name.to_string(),
        })
    }
}

pub fn documents_table(name: &str) -> String {
    format!("{}_documents", name)
}

pub fn transactions_table(name: &str) -> String {
    format!("{}_transactions", name)
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
