//! The in-memory append buffer the ingest path writes into; flushed by
//! size threshold or background tick.

use tokio::sync::Mutex;

use super::record::AuditRecord;

/// Flush when the buffer reaches this many records.
pub const FLUSH_SIZE: usize = 100;

#[derive(Default)]
pub struct Buffer {
    inner: Mutex<Vec<AuditRecord>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record`; returns the buffer length after the push, so the
    /// caller can decide whether to flush immediately.
    pub async fn push(&self, record: AuditRecord) -> usize {
        let mut buffer = self.inner.lock().await;
        buffer.push(record);
        buffer.len()
    }

    /// Removes and returns every buffered record.
    pub async fn drain(&self) -> Vec<AuditRecord> {
        let mut buffer = self.inner.lock().await;
        std::mem::take(&mut *buffer)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
