//! A single live SSE connection: an outbound bounded queue, heartbeat
//! tracking, and the per-connection rolling delivery window used for rate
//! limiting.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::domain::OwnerId;

use super::message::Frame;

/// Bounded so a stalled client cannot grow memory without limit; well above
/// any burst this fabric's rate limit permits.
const QUEUE_CAPACITY: usize = 256;

/// At most 10 events delivered per connection per rolling second.
const RATE_WINDOW_CAPACITY: usize = 10;

pub struct Connection {
    pub id: Uuid,
    pub owner_id: OwnerId,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Frame>,
    last_heartbeat_at: Mutex<DateTime<Utc>>,
    send_timestamps: Mutex<VecDeque<DateTime<Utc>>>,
}

impl Connection {
    pub fn new(owner_id: OwnerId) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let now = Utc::now();
        let connection = Self {
            id: Uuid::new_v4(),
            owner_id,
            connected_at: now,
            sender,
            last_heartbeat_at: Mutex::new(now),
            send_timestamps: Mutex::new(VecDeque::with_capacity(RATE_WINDOW_CAPACITY)),
        };
        (Arc::new(connection), receiver)
    }

    pub async fn last_heartbeat_at(&self) -> DateTime<Utc> {
        *self.last_heartbeat_at.lock().await
    }

    /// Drops timestamps older than 1s from the front, then admits `frame`
    /// only if fewer than 10 remain. Returns whether it was enqueued.
    pub async fn try_deliver(&self, frame: Frame, now: DateTime<Utc>) -> bool {
        let mut timestamps = self.send_timestamps.lock().await;
        while matches!(timestamps.front(), Some(&front) if now - front > ChronoDuration::seconds(1)) {
            timestamps.pop_front();
        }
        if timestamps.len() >= RATE_WINDOW_CAPACITY {
            return false;
        }
        if self.sender.try_send(frame).is_err() {
            return false;
        }
        timestamps.push_back(now);
        true
    }

    /// Enqueues a heartbeat frame and refreshes `last_heartbeat_at` only on
    /// success -- a client that has gone away fails the enqueue, and its
    /// timestamp goes stale until the eviction tick collects it.
    pub async fn heartbeat(&self, now: DateTime<Utc>) -> bool {
        if self.sender.try_send(Frame::heartbeat(now)).is_err() {
            return false;
        }
        *self.last_heartbeat_at.lock().await = now;
        true
    }
}
