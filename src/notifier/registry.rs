//! The SSE connection registry: owner-id to live connections, with the
//! per-owner connection cap and stale-connection eviction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::OwnerId;

use super::connection::Connection;
use super::message::Frame;

/// At most 3 live connections per owner-id.
pub const MAX_CONNECTIONS_PER_OWNER: usize = 3;

/// A connection with no heartbeat acknowledgment for longer than three
/// heartbeat intervals (90s) is stale.
pub const STALE_AFTER_SECS: i64 = 90;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("owner already has {0} live connections")]
    TooManyConnections(usize),
}

#[derive(Default)]
pub struct Registry {
    connections: RwLock<HashMap<OwnerId, Vec<Arc<Connection>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `TooManyConnections` when the owner already has 3 live
    /// connections; otherwise creates one and returns it with its receiver.
    pub async fn register(
        &self,
        owner_id: OwnerId,
    ) -> Result<(Arc<Connection>, mpsc::Receiver<Frame>), RegisterError> {
        let mut connections = self.connections.write().await;
        let live = connections.entry(owner_id).or_default();
        if live.len() >= MAX_CONNECTIONS_PER_OWNER {
            return Err(RegisterError::TooManyConnections(live.len()));
        }
        let (connection, receiver) = Connection::new(owner_id);
        live.push(connection.clone());
        Ok((connection, receiver))
    }

    /// Idempotent: removing an already-gone connection is a no-op.
    pub async fn unregister(&self, owner_id: OwnerId, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(live) = connections.get_mut(&owner_id) {
            live.retain(|conn| conn.id != connection_id);
            if live.is_empty() {
                connections.remove(&owner_id);
            }
        }
    }

    /// Delivers `frame` to every live connection of `owner_id`. Returns the
    /// count actually delivered; rate-limited drops are logged, not errors.
    pub async fn deliver(&self, owner_id: OwnerId, frame: Frame) -> usize {
        let connections = self.connections.read().await;
        let Some(live) = connections.get(&owner_id) else {
            return 0;
        };
        let now = Utc::now();
        let mut delivered = 0;
        for connection in live {
            if connection.try_deliver(frame.clone(), now).await {
                delivered += 1;
            } else {
                tracing::info!(
                    owner_id = %owner_id,
                    connection_id = %connection.id,
                    "rate-limited: dropping notification for this connection"
                );
            }
        }
        delivered
    }

    /// Enqueues a heartbeat frame on every live connection.
    pub async fn heartbeat_all(&self) {
        let connections = self.connections.read().await;
        let now = Utc::now();
        for live in connections.values() {
            for connection in live {
                connection.heartbeat(now).await;
            }
        }
    }

    /// Removes every connection whose `last_heartbeat_at` is older than
    /// `STALE_AFTER_SECS`. Returns the number evicted.
    pub async fn evict_stale(&self) -> usize {
        let mut connections = self.connections.write().await;
        let now = Utc::now();
        let cutoff = ChronoDuration::seconds(STALE_AFTER_SECS);
        let mut evicted = 0;
        let owners: Vec<OwnerId> = connections.keys().copied().collect();
        for owner_id in owners {
            let Some(live) = connections.get(&owner_id) else {
                continue;
            };
            let mut keep = Vec::with_capacity(live.len());
            for connection in live {
                if now - connection.last_heartbeat_at().await > cutoff {
                    evicted += 1;
                } else {
                    keep.push(connection.clone());
                }
            }
            if keep.is_empty() {
                connections.remove(&owner_id);
            } else {
                connections.insert(owner_id, keep);
            }
        }
        evicted
    }

    pub async fn live_count(&self, owner_id: OwnerId) -> usize {
        self.connections
            .read()
            .await
            .get(&owner_id)
            .map_or(0, Vec::len)
    }
}
