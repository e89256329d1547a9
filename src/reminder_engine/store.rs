//! Persistence for the pending-reminder snapshot: a periodic
//! delete-then-insert into `reminder_schedule`, and a startup reload that
//! drops rows already past-due rather than firing them late.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::TaskSnippet;

use super::heap::ReminderEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(FromRow)]
struct ReminderRow {
    reminder_id: String,
    task_id: String,
    owner_id: String,
    trigger_at: String,
    reminder_kind: String,
    task_title: String,
    task_due_at: Option<String>,
}

impl TryFrom<ReminderRow> for ReminderEntry {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            reminder_id: Uuid::parse_str(&row.reminder_id).map_err(|e| {
                StoreError::Db(sqlx::Error::Decode(Box::new(e)))
            })?,
            task_id: Uuid::parse_str(&row.task_id)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            owner_id: Uuid::parse_str(&row.owner_id)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?,
            trigger_at: DateTime::parse_from_rfc3339(&row.trigger_at)
                .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))?
                .with_timezone(&Utc),
            reminder_kind: row.reminder_kind,
            task_snippet: TaskSnippet {
                title: row.task_title,
                due_date: row
                    .task_due_at
                    .map(|s| {
                        DateTime::parse_from_rfc3339(&s)
                            .map(|dt| dt.with_timezone(&Utc))
                            .map_err(|e| StoreError::Db(sqlx::Error::Decode(Box::new(e))))
                    })
                    .transpose()?,
            },
        })
    }
}

/// Snapshots `entries` into `reminder_schedule`, replacing the entire
/// `pending` set within a single transaction.
pub async fn persist_snapshot(pool: &SqlitePool, entries: &[ReminderEntry]) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM reminder_schedule WHERE status = 'pending'")
        .execute(&mut *tx)
        .await?;

    for entry in entries {
        sqlx::query(
            "INSERT INTO reminder_schedule \
             (reminder_id, task_id, owner_id, trigger_at, reminder_kind, task_title, task_due_at, status, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
        )
        .bind(entry.reminder_id.to_string())
        .bind(entry.task_id.to_string())
        .bind(entry.owner_id.to_string())
        .bind(entry.trigger_at.to_rfc3339())
        .bind(&entry.reminder_kind)
        .bind(&entry.task_snippet.title)
        .bind(entry.task_snippet.due_date.map(|d| d.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Reloads every `pending` row whose `trigger_at` is still in the future.
/// Rows already past-due at load time are left behind rather than fired.
pub async fn load_future_pending(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<ReminderEntry>, StoreError> {
    let rows: Vec<ReminderRow> = sqlx::query_as(
        "SELECT reminder_id, task_id, owner_id, trigger_at, reminder_kind, task_title, task_due_at \
         FROM reminder_schedule WHERE status = 'pending' AND trigger_at > ?1",
    )
    .bind(now.to_rfc3339())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TryFrom::try_from).collect()
}
