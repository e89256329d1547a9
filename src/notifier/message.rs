//! SSE frame shapes and the event-to-notification mapping. Message strings
//! are taken verbatim from
//! `original_source/.../notification/sse_handler.py` and `event_consumer.py`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{EventEnvelope, EventPayload, OwnerId, TaskId};

#[derive(Debug, Clone, Serialize)]
pub struct NotificationData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub event: String,
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub data: NotificationData,
    #[serde(with = "crate::domain::timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatFrame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(with = "crate::domain::timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// One frame written to an SSE stream: either a notification envelope or a
/// heartbeat, per the SSE frame contract.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Frame {
    Notification(NotificationFrame),
    Heartbeat(HeartbeatFrame),
}

impl Frame {
    pub fn heartbeat(now: DateTime<Utc>) -> Self {
        Self::Heartbeat(HeartbeatFrame {
            kind: "heartbeat",
            timestamp: now,
        })
    }

    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        let data = notification_data(&envelope.payload);
        Self::Notification(NotificationFrame {
            kind: "notification",
            event: envelope.payload.event_type().to_string(),
            task_id: envelope.task_id,
            owner_id: envelope.user_id,
            data,
            timestamp: envelope.occurred_at,
        })
    }

    /// Renders the frame as one SSE `data: <json>\n\n` record.
    pub fn to_sse_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "none".to_string(),
        other => other.to_string(),
    }
}

fn notification_data(payload: &EventPayload) -> NotificationData {
    match payload {
        EventPayload::TaskCreated { snapshot } => NotificationData {
            message: format!("New task created: {}", snapshot.title),
            change_summary: None,
        },
        EventPayload::TaskUpdated { changes, .. } => {
            let mut fields: Vec<&String> = changes.keys().collect();
            fields.sort_unstable();
            let summary = fields
                .iter()
                .map(|field| {
                    let change = &changes[*field];
                    format!(
                        "{field}: {} \u{2192} {}",
                        render_value(&change.old),
                        render_value(&change.new)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            NotificationData {
                message: format!("Task updated: {summary}"),
                change_summary: Some(summary),
            }
        }
        EventPayload::TaskCompleted { .. } => NotificationData {
            message: "Task completed!".to_string(),
            change_summary: None,
        },
        EventPayload::TaskDeleted => NotificationData {
            message: "Task deleted".to_string(),
            change_summary: None,
        },
        EventPayload::ReminderTriggered { task, .. } => NotificationData {
            message: format!("Reminder: '{}' is due soon!", task.title),
            change_summary: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldChange, TaskSnapshot, TaskSnippet};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn envelope(payload: EventPayload) -> EventEnvelope {
        EventEnvelope {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            task_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            correlation_id: None,
            payload,
        }
    }

    #[test]
    fn task_created_message_includes_title() {
        let envelope = envelope(EventPayload::TaskCreated {
            snapshot: TaskSnapshot {
                title: "buy milk".to_string(),
                description: None,
                due_date: None,
                recurrence_pattern: None,
                recurrence_end_date: None,
                reminder_offset: None,
            },
        });
        let Frame::Notification(frame) = Frame::from_envelope(&envelope) else {
            panic!("expected notification frame");
        };
        assert_eq!(frame.data.message, "New task created: buy milk");
        assert_eq!(frame.event, "task.created");
    }

    #[test]
    fn task_completed_message_is_literal() {
        let envelope = envelope(EventPayload::TaskCompleted {
            completed_at: Utc::now(),
        });
        let Frame::Notification(frame) = Frame::from_envelope(&envelope) else {
            panic!("expected notification frame");
        };
        assert_eq!(frame.data.message, "Task completed!");
    }

    #[test]
    fn reminder_triggered_message_quotes_title() {
        let envelope = envelope(EventPayload::ReminderTriggered {
            reminder_kind: "due_date_reminder".to_string(),
            task: TaskSnippet {
                title: "buy milk".to_string(),
                due_date: None,
            },
        });
        let Frame::Notification(frame) = Frame::from_envelope(&envelope) else {
            panic!("expected notification frame");
        };
        assert_eq!(frame.data.message, "Reminder: 'buy milk' is due soon!");
    }

    #[test]
    fn task_updated_joins_changed_fields_in_sorted_order() {
        let mut changes = HashMap::new();
        changes.insert(
            "title".to_string(),
            FieldChange {
                old: Value::String("old title".to_string()),
                new: Value::String("new title".to_string()),
            },
        );
        changes.insert(
            "completed".to_string(),
            FieldChange {
                old: Value::Bool(false),
                new: Value::Bool(true),
            },
        );
        let envelope = envelope(EventPayload::TaskUpdated {
            changes,
            current: TaskSnapshot {
                title: "new title".to_string(),
                description: None,
                due_date: None,
                recurrence_pattern: None,
                recurrence_end_date: None,
                reminder_offset: None,
            },
        });
        let Frame::Notification(frame) = Frame::from_envelope(&envelope) else {
            panic!("expected notification frame");
        };
        assert_eq!(
            frame.data.change_summary.unwrap(),
            "completed: false \u{2192} true, title: old title \u{2192} new title"
        );
    }

    #[test]
    fn heartbeat_frame_serializes_with_type_tag() {
        let frame = Frame::heartbeat(Utc::now());
        let value: Value = serde_json::from_str(&frame.to_sse_data()).unwrap();
        assert_eq!(value["type"], "heartbeat");
        assert!(value.get("event").is_none());
    }
}
