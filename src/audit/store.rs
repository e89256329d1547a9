//! Persistence for the audit trail: batched upsert-ignoring-conflicts
//! writes, and the chronological per-task query.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{OwnerId, TaskId};

use super::record::AuditRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Default page size for `GetTaskHistory` when the caller does not specify
/// a limit.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Inserts every record inside one transaction, using `INSERT OR IGNORE`
/// so a reinsert of an already-stored `event_id` is silently dropped. On
/// any error the whole transaction is rolled back and the batch is
/// considered entirely unflushed -- callers must not re-buffer it.
pub async fn insert_batch(pool: &SqlitePool, records: &[AuditRecord]) -> Result<(), StoreError> {
    if records.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for record in records {
        sqlx::query(
            "INSERT OR IGNORE INTO task_events \
             (event_id, event_type, task_id, owner_id, occurred_at, payload, correlation_id, partition_key) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(record.event_id.to_string())
        .bind(&record.event_type)
        .bind(record.task_id.to_string())
        .bind(record.owner_id.to_string())
        .bind(record.occurred_at.to_rfc3339())
        .bind(&record.payload)
        .bind(record.correlation_id.map(|id| id.to_string()))
        .bind(&record.partition_key)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone, FromRow)]
struct HistoryRow {
    event_id: String,
    event_type: String,
    task_id: String,
    owner_id: String,
    occurred_at: String,
    payload: String,
    correlation_id: Option<String>,
    partition_key: String,
}

/// A row in `GetTaskHistory`'s result, parsed from storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub occurred_at: DateTime<Utc>,
    pub payload: String,
    pub correlation_id: Option<Uuid>,
    pub partition_key: String,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event_id: Uuid::parse_str(&row.event_id)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            event_type: row.event_type,
            task_id: Uuid::parse_str(&row.task_id)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            owner_id: Uuid::parse_str(&row.owner_id)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            occurred_at: DateTime::parse_from_rfc3339(&row.occurred_at)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?
                .with_timezone(&Utc),
            payload: row.payload,
            correlation_id: row
                .correlation_id
                .map(|id| Uuid::parse_str(&id))
                .transpose()
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            partition_key: row.partition_key,
        })
    }
}

/// `GetTaskHistory(task_id, limit) -> [records]`, ordered by `occurred_at`
/// ascending (producer-stamped time, not ingest order).
pub async fn task_history(
    pool: &SqlitePool,
    task_id: TaskId,
    limit: i64,
) -> Result<Vec<HistoryRecord>, StoreError> {
    let rows: Vec<HistoryRow> = sqlx::query_as(
        "SELECT event_id, event_type, task_id, owner_id, occurred_at, payload, correlation_id, partition_key \
         FROM task_events WHERE task_id = ?1 ORDER BY occurred_at ASC LIMIT ?2",
    )
    .bind(task_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryFrom::try_from).collect()
}
