//! The Notifier: owns the connection registry, maps task events onto SSE
//! frames, and drives the heartbeat and eviction background ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{EventEnvelope, OwnerId};

use super::connection::Connection;
use super::message::Frame;
use super::registry::{RegisterError, Registry};

pub struct Notifier {
    registry: Arc<Registry>,
    running: Arc<AtomicBool>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub async fn register(
        &self,
        owner_id: OwnerId,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<Frame>), RegisterError> {
        self.registry.register(owner_id).await
    }

    pub async fn unregister(&self, owner_id: OwnerId, connection_id: Uuid) {
        self.registry.unregister(owner_id, connection_id).await;
    }

    /// Maps `envelope` onto a notification frame and fans it out to the
    /// owner's live connections. Returns the count delivered.
    pub async fn handle_event(&self, envelope: &EventEnvelope) -> usize {
        let frame = Frame::from_envelope(envelope);
        self.registry.deliver(envelope.user_id, frame).await
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Every `tick`, enqueues a heartbeat frame on every live connection.
    pub async fn run_heartbeat_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            self.registry.heartbeat_all().await;
        }
    }

    /// Every `tick`, evicts connections stale for longer than 90s.
    pub async fn run_eviction_loop(self: Arc<Self>, tick: Duration) {
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(tick).await;
            let evicted = self.registry.evict_stale().await;
            if evicted > 0 {
                tracing::info!(evicted, "evicted stale SSE connections");
            }
        }
    }
}
