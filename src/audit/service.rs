//! The Audit Ingestor: subscribes to all four task topics, batches
//! records, and flushes them idempotently into the append-only store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::domain::{EventEnvelope, TaskId};

use super::buffer::{Buffer, FLUSH_SIZE};
use super::record::AuditRecord;
use super::store::{self, HistoryRecord, StoreError, DEFAULT_HISTORY_LIMIT};

pub struct AuditIngestor {
    buffer: Buffer,
    pool: SqlitePool,
    running: Arc<AtomicBool>,
}

impl AuditIngestor {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            buffer: Buffer::new(),
            pool,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn buffered_count(&self) -> usize {
        self.buffer.len().await
    }

    /// Enriches `envelope` with its partition key and appends it to the
    /// buffer, flushing immediately once the size threshold is reached.
    pub async fn handle_event(&self, envelope: &EventEnvelope) {
        let record = AuditRecord::from_envelope(envelope);
        let len = self.buffer.push(record).await;
        if len >= FLUSH_SIZE {
            self.flush().await;
        }
    }

    /// Drains the buffer and writes it in one transaction. On failure the
    /// batch is dropped, not re-buffered -- relies on broker at-least-once
    /// redelivery for recovery. Returns the number of records flushed, 0
    /// on failure.
    pub async fn flush(&self) -> usize {
        let records = self.buffer.drain().await;
        if records.is_empty() {
            return 0;
        }
        match store::insert_batch(&self.pool, &records).await {
            Ok(()) => records.len(),
            Err(err) => {
                tracing::error!(error = %err, count = records.len(), "audit flush failed, dropping batch");
                0
            }
        }
    }

    pub async fn task_history(
        &self,
        task_id: TaskId,
        limit: Option<i64>,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        store::task_history(&self.pool, task_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT)).await
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Flushes every `tick`, independent of the size threshold.
    pub async fn run_flush_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            self.flush().await;
        }
    }

    /// Flushes whatever remains before the process exits.
    pub async fn shutdown(&self) {
        self.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EventPayload;
    use chrono::Utc;
    use uuid::Uuid;

    async fn memory_pool() -> SqlitePool {
        let pool = crate::infrastructure::db::connect("sqlite::memory:", 1)
            .await
            .unwrap();
        crate::infrastructure::db::migrate(&pool).await.unwrap();
        pool
    }

    fn envelope(event_id: Uuid, task_id: TaskId) -> EventEnvelope {
        EventEnvelope {
            event_id,
            occurred_at: Utc::now(),
            task_id,
            user_id: Uuid::new_v4(),
            correlation_id: None,
            payload: EventPayload::TaskDeleted,
        }
    }

    #[tokio::test]
    async fn publish_twice_then_query_returns_exactly_one_record() {
        let ingestor = AuditIngestor::new(memory_pool().await);
        let event_id = Uuid::new_v4();
        let task_id = TaskId::new_v4();
        ingestor.handle_event(&envelope(event_id, task_id)).await;
        ingestor.handle_event(&envelope(event_id, task_id)).await;
        ingestor.flush().await;

        let history = ingestor.task_history(task_id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_type, "task.deleted");
    }

    #[tokio::test]
    async fn flush_at_size_threshold_clears_the_buffer() {
        let ingestor = AuditIngestor::new(memory_pool().await);
        let task_id = TaskId::new_v4();
        for _ in 0..FLUSH_SIZE {
            ingestor.handle_event(&envelope(Uuid::new_v4(), task_id)).await;
        }
        assert_eq!(ingestor.buffered_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_flushes_remaining_buffer() {
        let ingestor = AuditIngestor::new(memory_pool().await);
        let task_id = TaskId::new_v4();
        ingestor.handle_event(&envelope(Uuid::new_v4(), task_id)).await;
        assert_eq!(ingestor.buffered_count().await, 1);
        ingestor.shutdown().await;
        assert_eq!(ingestor.buffered_count().await, 0);
        assert_eq!(ingestor.task_history(task_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_orders_by_occurred_at_ascending() {
        let ingestor = AuditIngestor::new(memory_pool().await);
        let task_id = TaskId::new_v4();
        let earlier = EventEnvelope {
            occurred_at: DateTimeFixture::earlier(),
            ..envelope(Uuid::new_v4(), task_id)
        };
        let later = EventEnvelope {
            occurred_at: DateTimeFixture::later(),
            ..envelope(Uuid::new_v4(), task_id)
        };
        ingestor.handle_event(&later).await;
        ingestor.handle_event(&earlier).await;
        ingestor.flush().await;

        let history = ingestor.task_history(task_id, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].occurred_at < history[1].occurred_at);
    }

    struct DateTimeFixture;
    impl DateTimeFixture {
        fn earlier() -> chrono::DateTime<Utc> {
            chrono::DateTime::parse_from_rfc3339("2025-03-10T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        }
        fn later() -> chrono::DateTime<Utc> {
            chrono::DateTime::parse_from_rfc3339("2025-03-10T01:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        }
    }
}
