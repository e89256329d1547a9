//! Audit Ingestor: a batched, idempotent, append-only event store with
//! time-partitioned layout and chronological per-task query.

mod buffer;
mod record;
mod service;
mod store;

pub use record::AuditRecord;
pub use service::AuditIngestor;
pub use store::{HistoryRecord, StoreError, DEFAULT_HISTORY_LIMIT};
