//! The reminder heap: a mutex-guarded min-heap ordered by `trigger_at`,
//! with linear-scan removal by task id.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{OwnerId, TaskId, TaskSnippet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEntry {
    pub reminder_id: Uuid,
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub trigger_at: DateTime<Utc>,
    pub reminder_kind: String,
    pub task_snippet: TaskSnippet,
}

impl PartialOrd for ReminderEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so `BinaryHeap` (a max-heap) pops the earliest `trigger_at` first.
impl Ord for ReminderEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.trigger_at.cmp(&self.trigger_at)
    }
}

#[derive(Default)]
pub struct ReminderHeap {
    inner: Mutex<BinaryHeap<ReminderEntry>>,
}

impl ReminderHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: ReminderEntry) {
        let mut heap = self.inner.lock().await;
        heap.push(entry);
    }

    /// Pops every entry whose `trigger_at <= now`, earliest first.
    pub async fn pop_due(&self, now: DateTime<Utc>) -> Vec<ReminderEntry> {
        let mut heap = self.inner.lock().await;
        let mut due = Vec::new();
        while let Some(top) = heap.peek() {
            if top.trigger_at > now {
                break;
            }
            // unwrap: we just confirmed peek() is Some.
            due.push(heap.pop().unwrap());
        }
        due
    }

    pub async fn peek_trigger_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().await.peek().map(|e| e.trigger_at)
    }

    /// Linear scan + re-heapify. Returns true if any entry was removed.
    pub async fn remove_by_task_id(&self, task_id: TaskId) -> bool {
        let mut heap = self.inner.lock().await;
        let before = heap.len();
        let retained: BinaryHeap<ReminderEntry> =
            heap.drain().filter(|entry| entry.task_id != task_id).collect();
        *heap = retained;
        heap.len() < before
    }

    pub async fn snapshot(&self) -> Vec<ReminderEntry> {
        self.inner.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
