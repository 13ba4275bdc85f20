//! Advisory audit log
//!
//! One row per applied commit or merge, summarising which identities were
//! touched. Reads never consult this table.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::commit::RecordKey;
use crate::storage::error::StorageResult;
use crate::storage::rows::timestamp;

/// A stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionEntry {
    pub id: String,
    pub workspace: String,
    pub author: Option<String>,
    pub message: Option<String>,
    pub summary: Value,
    pub created: DateTime<Utc>,
}

/// What a transaction touched, serialized into the `summary` column
#[derive(Debug, Default, Serialize)]
pub struct Summary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<&'a str>,
    pub added: Vec<RecordKey>,
    pub deleted: Vec<RecordKey>,
}

#[allow(clippy::too_many_arguments)]
pub fn record_transaction(
    conn: &Connection,
    table: &str,
    id: &Uuid,
    workspace: &str,
    author: Option<&str>,
    message: Option<&str>,
    summary: &Summary<'_>,
    created: i64,
) -> StorageResult<()> {
    let summary = serde_json::to_string(summary)?;
    let sql = format!(
        "INSERT INTO {table} (txn_id, workspace, author, message, summary, created) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
    );
    conn.execute(
        &sql,
        params![id.to_string(), workspace, author, message, summary, created],
    )?;
    Ok(())
}

/// Newest entries first
pub fn recent_transactions(
    conn: &Connection,
    table: &str,
    limit: usize,
) -> StorageResult<Vec<TransactionEntry>> {
    let sql = format!(
        "SELECT txn_id, workspace, author, message, summary, created FROM {table} \
         ORDER BY created DESC, rowid DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, workspace, author, message, summary, created)| {
            Ok(TransactionEntry {
                id,
                workspace,
                author,
                message,
                summary: serde_json::from_str(&summary)?,
                created: timestamp(created),
            })
        })
        .collect()
}
