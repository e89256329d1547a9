//! Notifier (SSE fan-out): maintains long-lived SSE connections, delivers
//! task events to the connected owner, and enforces the per-user connection
//! cap and per-connection rate limit.

mod connection;
mod message;
mod registry;
mod service;

pub use connection::Connection;
pub use message::{Frame, HeartbeatFrame, NotificationData, NotificationFrame};
pub use registry::{RegisterError, Registry, MAX_CONNECTIONS_PER_OWNER, STALE_AFTER_SECS};
pub use service::Notifier;
