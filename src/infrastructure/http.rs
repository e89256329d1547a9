//! HTTP building blocks shared by all four worker binaries: liveness,
//! readiness, and the Dapr subscription surface every worker exposes.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::domain::EventEnvelope;

/// One entry in the response of `GET /dapr/subscribe`.
#[derive(Debug, Clone, Serialize)]
pub struct DaprSubscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

impl DaprSubscription {
    pub fn new(pubsub_name: &str, topic: &str, route: &str) -> Self {
        Self {
            pubsubname: pubsub_name.to_string(),
            topic: topic.to_string(),
            route: route.to_string(),
        }
    }
}

/// `GET /health/live`: always 200 while the process is alive.
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// Best-effort decode of a dispatch request body. A malformed body is
/// logged and treated as a dropped (acked) event rather than a retry
/// target -- redelivery would never fix a payload that can't parse.
pub fn parse_envelope(body: &str) -> Option<EventEnvelope> {
    match serde_json::from_str(body) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            tracing::warn!(error = %err, "malformed event envelope, dropping");
            None
        }
    }
}

/// How a worker's event-dispatch handler should respond: malformed events
/// and permanent downstream failures are acked (dropped); transient
/// downstream failures return 500 so Dapr redelivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Acked,
    Retry,
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Acked => Json(serde_json::json!({ "success": true })).into_response(),
            Self::Retry => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
