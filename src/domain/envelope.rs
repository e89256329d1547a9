//! The event envelope: the one wire shape every producer and consumer in the
//! fabric agrees on.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

pub type TaskId = Uuid;
pub type OwnerId = Uuid;

/// The five topics the fabric's producers publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    TasksCreated,
    TasksUpdated,
    TasksCompleted,
    TasksDeleted,
    TasksReminderTriggered,
}

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TasksCreated => "tasks.created",
            Self::TasksUpdated => "tasks.updated",
            Self::TasksCompleted => "tasks.completed",
            Self::TasksDeleted => "tasks.deleted",
            Self::TasksReminderTriggered => "tasks.reminder-triggered",
        }
    }

    /// The topic a given payload belongs on. Used by the publisher so
    /// callers cannot mismatch a payload with the wrong topic.
    pub const fn for_payload(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::TaskCreated { .. } => Self::TasksCreated,
            EventPayload::TaskUpdated { .. } => Self::TasksUpdated,
            EventPayload::TaskCompleted { .. } => Self::TasksCompleted,
            EventPayload::TaskDeleted => Self::TasksDeleted,
            EventPayload::ReminderTriggered { .. } => Self::TasksReminderTriggered,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The subset of a task's fields a `task.created` event snapshots, and that
/// `task.updated`'s `changes` map reuses per field name. Recovered from
/// `original_source/Phase-II/backend/src/models/task.py`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<String>,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub recurrence_end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_offset: Option<String>,
}

/// One changed field as carried in a `task.updated` event's `changes` map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// A cached snippet of task data, carried on `reminder.triggered` so the
/// Notifier can render a human-readable message without calling back into
/// the (out-of-scope) Task API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnippet {
    pub title: String,
    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// The event-specific payload. Internally tagged on `event_type` so its
/// fields serialize flattened alongside the envelope's own fields, giving a
/// flat wire shape rather than a nested `payload` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    #[serde(rename = "task.created")]
    TaskCreated {
        #[serde(flatten)]
        snapshot: TaskSnapshot,
    },
    #[serde(rename = "task.updated")]
    TaskUpdated {
        changes: HashMap<String, FieldChange>,
        /// The task's current (post-update) snapshot, denormalized onto the
        /// event so downstream consumers (the Reminder Engine, rescheduling
        /// after a due-date/offset change) need not call back into the
        /// out-of-scope Task API.
        #[serde(flatten)]
        current: TaskSnapshot,
    },
    #[serde(rename = "task.completed")]
    TaskCompleted {
        #[serde(with = "timestamp")]
        completed_at: DateTime<Utc>,
    },
    #[serde(rename = "task.deleted")]
    TaskDeleted,
    #[serde(rename = "reminder.triggered")]
    ReminderTriggered {
        reminder_kind: String,
        #[serde(flatten)]
        task: TaskSnippet,
    },
}

impl EventPayload {
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::TaskCreated { .. } => "task.created",
            Self::TaskUpdated { .. } => "task.updated",
            Self::TaskCompleted { .. } => "task.completed",
            Self::TaskDeleted => "task.deleted",
            Self::ReminderTriggered { .. } => "reminder.triggered",
        }
    }
}

/// The envelope every event carries on the wire: `event_id` is the
/// deduplication key and is globally unique; `occurred_at` is stamped by the
/// producer and monotonic only within that producer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub occurred_at: DateTime<Utc>,
    pub task_id: TaskId,
    pub user_id: OwnerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventEnvelope {
    pub fn topic(&self) -> Topic {
        Topic::for_payload(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope() -> EventEnvelope {
        EventEnvelope {
            event_id: Uuid::new_v4(),
            occurred_at: DateTime::parse_from_rfc3339("2025-03-10T00:00:00.000Z")
                .unwrap()
                .with_timezone(&Utc),
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            correlation_id: None,
            payload: EventPayload::TaskCreated {
                snapshot: TaskSnapshot {
                    title: "buy milk".to_string(),
                    description: None,
                    due_date: None,
                    recurrence_pattern: None,
                    recurrence_end_date: None,
                    reminder_offset: None,
                },
            },
        }
    }

    #[test]
    fn parse_serialize_is_identity() {
        let envelope = sample_envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope, back);
    }

    #[test]
    fn wire_shape_flattens_event_type_and_payload_fields() {
        let envelope = sample_envelope();
        let value: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["event_type"], "task.created");
        assert_eq!(value["title"], "buy milk");
        assert_eq!(value["task_id"], envelope.task_id.to_string());
        assert!(value.get("payload").is_none(), "fields must be flattened, not nested");
    }

    #[test]
    fn topic_matches_payload_variant() {
        let envelope = sample_envelope();
        assert_eq!(envelope.topic(), Topic::TasksCreated);
        assert_eq!(envelope.topic().as_str(), "tasks.created");
    }

    #[test]
    fn reminder_triggered_uses_composite_key_free_event_id() {
        // Every event type, including reminder.triggered, gets a UUIDv4
        // event_id -- the source's non-UUID composite string for this one
        // event type is not carried forward.
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            correlation_id: None,
            payload: EventPayload::ReminderTriggered {
                reminder_kind: "due_date_reminder".to_string(),
                task: TaskSnippet {
                    title: "buy milk".to_string(),
                    due_date: None,
                },
            },
        };
        assert!(Uuid::parse_str(&envelope.event_id.to_string()).is_ok());
        assert_eq!(envelope.topic(), Topic::TasksReminderTriggered);
    }
}
