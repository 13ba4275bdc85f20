//! Row-level statements against a collection's documents table
//!
//! Every function takes a plain `&Connection`; a `Transaction` derefs to
//! one, so the same statements serve both reads and transactional writes.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::models::{Record, RecordFlag, DEFAULT_WORKSPACE};
use crate::storage::error::StorageResult;

/// Hands out strictly increasing millisecond timestamps
///
/// Two writes in the same transaction can land in the same millisecond;
/// the clock nudges later ones forward so their order is preserved.
#[derive(Debug, Default)]
pub struct WriteClock {
    last: i64,
}

impl WriteClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that continues after the newest timestamp already stored
    ///
    /// A large commit can run the clock ahead of wall time; later
    /// transactions must still stamp after it.
    pub fn resume(conn: &Connection, documents: &str, transactions: &str) -> StorageResult<Self> {
        let sql = format!(
            "SELECT MAX(latest) FROM ( \
               SELECT MAX(updated) AS latest FROM {documents} \
               UNION ALL SELECT MAX(created) FROM {transactions})"
        );
        let latest: Option<i64> = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(Self {
            last: latest.unwrap_or(0),
        })
    }

    pub fn tick(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// One physical row, flag included
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub uuid: String,
    pub language: String,
    pub workspace: String,
    pub document: String,
    pub updated: i64,
    pub flag: RecordFlag,
}

/// Convert stored epoch milliseconds to a timestamp
pub fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let updated: i64 = row.get(3)?;
    Ok(Record {
        uuid: row.get(0)?,
        language: row.get(1)?,
        document: row.get(2)?,
        updated: timestamp(updated),
    })
}

fn stored_row_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        uuid: row.get(0)?,
        language: row.get(1)?,
        workspace: row.get(2)?,
        document: row.get(3)?,
        updated: row.get(4)?,
        flag: row.get(5)?,
    })
}

fn placeholders(count: usize, first: usize) -> String {
    (first..first + count)
        .map(|n| format!("?{}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Visible records in the default workspace
pub fn select_default(
    conn: &Connection,
    table: &str,
    language: &str,
    uuids: &[String],
) -> StorageResult<Vec<Record>> {
    let sql = format!(
        "SELECT uuid, language, document, updated FROM {table} \
         WHERE workspace = ?1 AND language = ?2 AND flag = ?3 AND uuid IN ({})",
        placeholders(uuids.len(), 4)
    );
    debug!("Loading {} record(s) from {} ({})", uuids.len(), table, language);

    let mut stmt = conn.prepare(&sql)?;
    let normal = RecordFlag::Normal;
    let mut values: Vec<&dyn ToSql> = vec![&DEFAULT_WORKSPACE as &dyn ToSql, &language, &normal];
    values.extend(uuids.iter().map(|u| u as &dyn ToSql));

    let records = stmt
        .query_map(params_from_iter(values), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Visible records through a branch, falling through to the default workspace
///
/// A branch row wins when it is `normal` and hides the record when it is
/// `deleted`. Without a branch row the default row is used if it is `normal`.
pub fn select_branch(
    conn: &Connection,
    table: &str,
    workspace: &str,
    language: &str,
    uuids: &[String],
) -> StorageResult<Vec<Record>> {
    let sql = format!(
        "SELECT d.uuid, d.language, \
                COALESCE(b.document, d.document), COALESCE(b.updated, d.updated) \
         FROM {table} d \
         LEFT JOIN {table} b \
           ON b.uuid = d.uuid AND b.language = d.language AND b.workspace = ?1 \
         WHERE d.workspace = ?2 AND d.language = ?3 \
           AND ((b.uuid IS NULL AND d.flag = ?4) OR b.flag = ?4) \
           AND d.uuid IN ({})",
        placeholders(uuids.len(), 5)
    );
    debug!(
        "Loading {} record(s) from {} ({}) through workspace {}",
        uuids.len(),
        table,
        language,
        workspace
    );

    let mut stmt = conn.prepare(&sql)?;
    let normal = RecordFlag::Normal;
    let mut values: Vec<&dyn ToSql> =
        vec![&workspace as &dyn ToSql, &DEFAULT_WORKSPACE, &language, &normal];
    values.extend(uuids.iter().map(|u| u as &dyn ToSql));

    let records = stmt
        .query_map(params_from_iter(values), record_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Every visible record for a language in a workspace, ordered by uuid
pub fn select_all(
    conn: &Connection,
    table: &str,
    workspace: &str,
    language: &str,
) -> StorageResult<Vec<Record>> {
    let sql = format!(
        "SELECT d.uuid, d.language, \
                COALESCE(b.document, d.document), COALESCE(b.updated, d.updated) \
         FROM {table} d \
         LEFT JOIN {table} b \
           ON b.uuid = d.uuid AND b.language = d.language AND b.workspace = ?1 \
           AND ?1 <> d.workspace \
         WHERE d.workspace = ?2 AND d.language = ?3 \
           AND ((b.uuid IS NULL AND d.flag = ?4) OR b.flag = ?4) \
         ORDER BY d.uuid"
    );

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(
            params![workspace, DEFAULT_WORKSPACE, language, RecordFlag::Normal],
            record_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Check whether any row, whatever its flag, exists for the key
pub fn row_exists(
    conn: &Connection,
    table: &str,
    uuid: &str,
    language: &str,
    workspace: &str,
) -> StorageResult<bool> {
    let sql =
        format!("SELECT 1 FROM {table} WHERE uuid = ?1 AND language = ?2 AND workspace = ?3");
    let found = conn
        .query_row(&sql, params![uuid, language, workspace], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Insert a row, or overwrite document, timestamp and flag of the existing one
#[allow(clippy::too_many_arguments)]
pub fn upsert_row(
    conn: &Connection,
    table: &str,
    uuid: &str,
    language: &str,
    workspace: &str,
    document: &str,
    updated: i64,
    flag: RecordFlag,
) -> StorageResult<()> {
    let sql = format!(
        "INSERT INTO {table} (uuid, language, workspace, document, updated, flag) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (uuid, language, workspace) DO UPDATE SET \
           document = excluded.document, updated = excluded.updated, flag = excluded.flag"
    );
    conn.execute(
        &sql,
        params![uuid, language, workspace, document, updated, flag],
    )?;
    Ok(())
}

/// Insert an empty anchor row in the default workspace unless one exists
///
/// Returns true when a stub was written.
pub fn ensure_stub(
    conn: &Connection,
    table: &str,
    uuid: &str,
    language: &str,
    updated: i64,
) -> StorageResult<bool> {
    if row_exists(conn, table, uuid, language, DEFAULT_WORKSPACE)? {
        return Ok(false);
    }
    upsert_row(
        conn,
        table,
        uuid,
        language,
        DEFAULT_WORKSPACE,
        "",
        updated,
        RecordFlag::Stub,
    )?;
    Ok(true)
}

/// All rows stored in one workspace, across languages
pub fn workspace_rows(
    conn: &Connection,
    table: &str,
    workspace: &str,
) -> StorageResult<Vec<StoredRow>> {
    let sql = format!(
        "SELECT uuid, language, workspace, document, updated, flag FROM {table} \
         WHERE workspace = ?1 ORDER BY updated, uuid, language"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![workspace], stored_row_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch one physical row regardless of its flag
pub fn get_row(
    conn: &Connection,
    table: &str,
    uuid: &str,
    language: &str,
    workspace: &str,
) -> StorageResult<Option<StoredRow>> {
    let sql = format!(
        "SELECT uuid, language, workspace, document, updated, flag FROM {table} \
         WHERE uuid = ?1 AND language = ?2 AND workspace = ?3"
    );
    let row = conn
        .query_row(&sql, params![uuid, language, workspace], stored_row_from_row)
        .optional()?;
    Ok(row)
}

/// Remove every row of a workspace; returns the number removed
pub fn clear_workspace(conn: &Connection, table: &str, workspace: &str) -> StorageResult<usize> {
    let sql = format!("DELETE FROM {table} WHERE workspace = ?1");
    Ok(conn.execute(&sql, params![workspace])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::ensure_collection;

    const TABLE: &str = "col_documents";

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_collection(&conn, "col").unwrap();
        conn
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let mut clock = WriteClock::new();
        let mut last = clock.tick();
        for _ in 0..100 {
            let next = clock.tick();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_resumed_clock_stamps_after_stored_rows() {
        let conn = setup();
        assert_eq!(WriteClock::resume(&conn, TABLE, "col_transactions").unwrap().last, 0);

        let ahead = Utc::now().timestamp_millis() + 60_000;
        upsert_row(&conn, TABLE, "1", "en", "default", "a", ahead, RecordFlag::Normal).unwrap();

        let mut clock = WriteClock::resume(&conn, TABLE, "col_transactions").unwrap();
        assert!(clock.tick() > ahead);
    }

    #[test]
    fn test_upsert_overwrites_existing_row() {
        let conn = setup();
        upsert_row(&conn, TABLE, "1", "en", "default", "a", 10, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "1", "en", "default", "", 20, RecordFlag::Deleted).unwrap();

        let row = get_row(&conn, TABLE, "1", "en", "default").unwrap().unwrap();
        assert_eq!(row.document, "");
        assert_eq!(row.updated, 20);
        assert_eq!(row.flag, RecordFlag::Deleted);
    }

    #[test]
    fn test_ensure_stub_only_once() {
        let conn = setup();
        assert!(ensure_stub(&conn, TABLE, "1", "en", 5).unwrap());
        assert!(!ensure_stub(&conn, TABLE, "1", "en", 6).unwrap());

        let row = get_row(&conn, TABLE, "1", "en", "default").unwrap().unwrap();
        assert_eq!(row.flag, RecordFlag::Stub);
        assert_eq!(row.updated, 5);
    }

    #[test]
    fn test_ensure_stub_respects_existing_record() {
        let conn = setup();
        upsert_row(&conn, TABLE, "1", "en", "default", "a", 1, RecordFlag::Normal).unwrap();
        assert!(!ensure_stub(&conn, TABLE, "1", "en", 2).unwrap());

        let row = get_row(&conn, TABLE, "1", "en", "default").unwrap().unwrap();
        assert_eq!(row.flag, RecordFlag::Normal);
        assert_eq!(row.document, "a");
    }

    #[test]
    fn test_select_default_skips_stubs_and_tombstones() {
        let conn = setup();
        upsert_row(&conn, TABLE, "1", "en", "default", "a", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "2", "en", "default", "", 1, RecordFlag::Stub).unwrap();
        upsert_row(&conn, TABLE, "3", "en", "default", "", 1, RecordFlag::Deleted).unwrap();

        let uuids: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let records = select_default(&conn, TABLE, "en", &uuids).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uuid, "1");
    }

    #[test]
    fn test_select_branch_resolution() {
        let conn = setup();
        // fallback
        upsert_row(&conn, TABLE, "1", "en", "default", "base", 1, RecordFlag::Normal).unwrap();
        // override
        upsert_row(&conn, TABLE, "2", "en", "default", "base", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "2", "en", "b", "branch", 2, RecordFlag::Normal).unwrap();
        // masked
        upsert_row(&conn, TABLE, "3", "en", "default", "base", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "3", "en", "b", "", 2, RecordFlag::Deleted).unwrap();
        // stub in default, created in another branch
        upsert_row(&conn, TABLE, "4", "en", "default", "", 1, RecordFlag::Stub).unwrap();
        upsert_row(&conn, TABLE, "4", "en", "other", "elsewhere", 2, RecordFlag::Normal).unwrap();

        let uuids: Vec<String> = ["1", "2", "3", "4"].iter().map(|s| s.to_string()).collect();
        let mut records = select_branch(&conn, TABLE, "b", "en", &uuids).unwrap();
        records.sort_by(|a, b| a.uuid.cmp(&b.uuid));

        let docs: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.uuid.as_str(), r.document.as_str()))
            .collect();
        assert_eq!(docs, vec![("1", "base"), ("2", "branch")]);
        assert_eq!(records[1].updated.timestamp_millis(), 2);
    }

    #[test]
    fn test_select_all_in_default_and_branch() {
        let conn = setup();
        upsert_row(&conn, TABLE, "b", "en", "default", "two", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "a", "en", "default", "one", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "c", "en", "default", "", 1, RecordFlag::Stub).unwrap();
        upsert_row(&conn, TABLE, "c", "en", "branch", "three", 2, RecordFlag::Normal).unwrap();

        let base = select_all(&conn, TABLE, "default", "en").unwrap();
        let uuids: Vec<&str> = base.iter().map(|r| r.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "b"]);

        let branch = select_all(&conn, TABLE, "branch", "en").unwrap();
        let uuids: Vec<&str> = branch.iter().map(|r| r.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clear_workspace() {
        let conn = setup();
        upsert_row(&conn, TABLE, "1", "en", "default", "a", 1, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "1", "en", "b", "x", 2, RecordFlag::Normal).unwrap();
        upsert_row(&conn, TABLE, "2", "fr", "b", "", 2, RecordFlag::Deleted).unwrap();

        assert_eq!(clear_workspace(&conn, TABLE, "b").unwrap(), 2);
        assert!(workspace_rows(&conn, TABLE, "b").unwrap().is_empty());
        assert_eq!(workspace_rows(&conn, TABLE, "default").unwrap().len(), 1);
    }
}
