//! The audit record shape and its derivation from an event envelope.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

use crate::domain::{EventEnvelope, OwnerId, TaskId};

/// An append-only audit row. `event_id` is the dedup key: reinserts are
/// ignored, never erroring the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub occurred_at: DateTime<Utc>,
    /// The full envelope, serialized -- an opaque blob a query need not
    /// interpret, and self-contained enough to replay.
    pub payload: String,
    pub correlation_id: Option<Uuid>,
    /// First-of-month of `occurred_at`, `YYYY-MM-01`.
    pub partition_key: String,
}

pub fn partition_key(occurred_at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}-01", occurred_at.year(), occurred_at.month())
}

impl AuditRecord {
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self {
            event_id: envelope.event_id,
            event_type: envelope.payload.event_type().to_string(),
            task_id: envelope.task_id,
            owner_id: envelope.user_id,
            occurred_at: envelope.occurred_at,
            payload: serde_json::to_string(envelope).unwrap_or_default(),
            correlation_id: envelope.correlation_id,
            partition_key: partition_key(envelope.occurred_at),
        }
    }
}
