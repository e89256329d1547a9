//! The pub/sub broker abstraction. Production deployments talk to a Dapr
//! sidecar over HTTP; a no-op implementation stands in when no broker
//! address is configured so producers degrade gracefully instead of
//! refusing to start.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::EventEnvelope;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("broker returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("broker publish timed out")]
    Timeout,
}

/// The only interface producers use to put an envelope on the bus.
#[async_trait]
pub trait PubSubBroker: Send + Sync {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), BrokerError>;

    /// Used by `/health/ready`; broker unreachability is a degraded, not
    /// unhealthy, condition.
    async fn is_reachable(&self) -> bool;
}

/// Dapr's HTTP publish API: `POST /v1.0/publish/{pubsubname}/{topic}`.
pub struct DaprHttpBroker {
    client: reqwest::Client,
    base_url: String,
    pubsub_name: String,
    publish_timeout: Duration,
}

impl DaprHttpBroker {
    pub fn new(dapr_http_port: u16, pubsub_name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("http://localhost:{dapr_http_port}"),
            pubsub_name: pubsub_name.into(),
            publish_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl PubSubBroker for DaprHttpBroker {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), BrokerError> {
        let url = format!(
            "{}/v1.0/publish/{}/{}",
            self.base_url, self.pubsub_name, topic
        );
        let response = tokio::time::timeout(
            self.publish_timeout,
            self.client.post(&url).json(envelope).send(),
        )
        .await
        .map_err(|_| BrokerError::Timeout)??;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BrokerError::Status(response.status()))
        }
    }

    async fn is_reachable(&self) -> bool {
        let url = format!("{}/v1.0/healthz", self.base_url);
        let check = self.client.get(&url).send();
        matches!(
            tokio::time::timeout(Duration::from_secs(2), check).await,
            Ok(Ok(response)) if response.status().is_success()
        )
    }
}

/// Used when no broker address is configured. Swallows every publish,
/// logging at `debug` -- the caller's write has already been committed and
/// a missing broker is treated as a deployment choice, not an error.
#[derive(Default)]
pub struct NoopBroker;

#[async_trait]
impl PubSubBroker for NoopBroker {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), BrokerError> {
        tracing::debug!(
            topic,
            event_id = %envelope.event_id,
            "no broker configured, discarding event"
        );
        Ok(())
    }

    async fn is_reachable(&self) -> bool {
        false
    }
}
