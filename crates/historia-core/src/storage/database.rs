//! Shared SQLite handle
//!
//! A `Database` is a cheap, cloneable handle to one SQLite connection.
//! Collections hold a clone and never own the connection outright, so any
//! number of narrowed views can share it.
//!
//! Reads run directly against the connection. Writes go through
//! [`Database::transaction`], which commits when the closure succeeds and
//! rolls back on every other exit path.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::collection::Collection;
use crate::config::Config;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};

/// Cloneable handle to the backing store
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database described by the configuration
    pub fn open(config: &Config) -> StorageResult<Self> {
        let path = config.sqlite_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        debug!("Opening database at {:?}", path);
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get a view over the named collection, creating its tables if needed
    pub fn collection(&self, name: &str) -> StorageResult<Collection> {
        Collection::new(self, name)
    }

    /// Run a read against the connection outside any explicit transaction
    pub fn with_connection<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside one store transaction
    ///
    /// Commits when `f` returns `Ok`. When `f` fails the transaction is
    /// rolled back and the original error is returned unchanged. A panic
    /// inside `f` drops the transaction, which also rolls back.
    pub fn transaction<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                warn!("Rolling back transaction: {}", err);
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Rollback failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}
