//! The Reminder Engine: holds all future reminders in memory, fires them
//! at their trigger time, and emits `reminder.triggered` events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::{EventEnvelope, EventPayload, OwnerId, TaskId, TaskSnapshot, TaskSnippet};
use crate::publisher::Publisher;

use super::heap::{ReminderEntry, ReminderHeap};
use super::offset;
use super::store::{self, StoreError};

pub struct ReminderEngine {
    heap: ReminderHeap,
    publisher: Arc<Publisher>,
    pool: SqlitePool,
    running: Arc<AtomicBool>,
}

impl ReminderEngine {
    pub fn new(publisher: Arc<Publisher>, pool: SqlitePool) -> Self {
        Self {
            heap: ReminderHeap::new(),
            publisher,
            pool,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.heap.len().await
    }

    /// Reloads rows still pending and in the future. Rows already past-due
    /// at load time are intentionally dropped, not fired late.
    pub async fn load_from_snapshot(&self) -> Result<usize, StoreError> {
        let entries = store::load_future_pending(&self.pool, Utc::now()).await?;
        let loaded = entries.len();
        for entry in entries {
            self.heap.insert(entry).await;
        }
        Ok(loaded)
    }

    pub async fn handle_event(&self, envelope: &EventEnvelope) {
        match &envelope.payload {
            EventPayload::TaskCreated { snapshot } => {
                self.schedule_from_snapshot(envelope.task_id, envelope.user_id, snapshot)
                    .await;
            }
            EventPayload::TaskUpdated { changes, current } => {
                if changes.contains_key("due_date") || changes.contains_key("reminder_offset") {
                    self.heap.remove_by_task_id(envelope.task_id).await;
                    self.schedule_from_snapshot(envelope.task_id, envelope.user_id, current)
                        .await;
                }
            }
            EventPayload::TaskCompleted { .. } | EventPayload::TaskDeleted => {
                self.heap.remove_by_task_id(envelope.task_id).await;
            }
            EventPayload::ReminderTriggered { .. } => {
                // Not consumed by this worker; the Notifier handles it.
            }
        }
    }

    async fn schedule_from_snapshot(&self, task_id: TaskId, owner_id: OwnerId, snapshot: &TaskSnapshot) {
        let Some(due_date) = snapshot.due_date else {
            return;
        };
        let Some(raw_offset) = snapshot.reminder_offset.as_deref() else {
            return;
        };
        let Ok(offset) = offset::parse(raw_offset) else {
            tracing::debug!(task_id = %task_id, raw_offset, "unparseable reminder offset, no reminder scheduled");
            return;
        };
        let trigger_at = due_date - offset;
        if trigger_at <= Utc::now() {
            tracing::debug!(task_id = %task_id, "computed trigger is not in the future, no reminder scheduled");
            return;
        }

        self.heap
            .insert(ReminderEntry {
                reminder_id: Uuid::new_v4(),
                task_id,
                owner_id,
                trigger_at,
                reminder_kind: "due_date_reminder".to_string(),
                task_snippet: TaskSnippet {
                    title: snapshot.title.clone(),
                    due_date: snapshot.due_date,
                },
            })
            .await;
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Pops and publishes every entry due by `now`. A publish failure drops
    /// the single entry -- at-least-once is otherwise provided by the
    /// broker, and losing one reminder on a failed publish is an accepted
    /// gap rather than a retry target.
    pub async fn fire_due(&self, now: chrono::DateTime<Utc>) {
        let due = self.heap.pop_due(now).await;
        for entry in due {
            let result = self
                .publisher
                .publish(
                    EventPayload::ReminderTriggered {
                        reminder_kind: entry.reminder_kind.clone(),
                        task: entry.task_snippet.clone(),
                    },
                    entry.task_id,
                    entry.owner_id,
                    None,
                )
                .await;
            if let Err(err) = result {
                tracing::warn!(
                    task_id = %entry.task_id,
                    error = %err,
                    "dropped reminder.triggered: publish failed"
                );
            }
        }
    }

    /// The background firing loop: calls `fire_due` every `tick`.
    pub async fn run_firing_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            self.fire_due(Utc::now()).await;
        }
    }

    /// Every `tick`, snapshots the heap into `reminder_schedule`.
    pub async fn run_persistence_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            let snapshot = self.heap.snapshot().await;
            if let Err(err) = store::persist_snapshot(&self.pool, &snapshot).await {
                tracing::error!(error = %err, "failed to persist reminder snapshot");
            }
        }
    }
}
