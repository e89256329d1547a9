use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{EventEnvelope, EventPayload, OwnerId, TaskId, Topic};

use super::broker::{BrokerError, PubSubBroker};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// `Publish(topic, eventType, taskID, ownerID, payload, correlationID?) ->
/// ok|error`. Stamps `event_id` and `occurred_at`, then hands the envelope
/// to whatever `PubSubBroker` this process was configured with.
///
/// This is the only type in the crate that holds a broker handle -- every
/// worker's producing side goes through an `Arc<Publisher>`, never the
/// broker directly.
pub struct Publisher {
    broker: Arc<dyn PubSubBroker>,
}

impl Publisher {
    pub fn new(broker: Arc<dyn PubSubBroker>) -> Self {
        Self { broker }
    }

    /// Publishes `payload` on the topic its variant belongs to.
    ///
    /// On failure, logs a warning and returns `Err` -- it is the caller's
    /// responsibility to treat that as logged-and-continue rather than a
    /// fatal error, since the caller's own write has already committed by
    /// the time it publishes.
    pub async fn publish(
        &self,
        payload: EventPayload,
        task_id: TaskId,
        owner_id: OwnerId,
        correlation_id: Option<Uuid>,
    ) -> Result<(), PublishError> {
        let topic = Topic::for_payload(&payload);
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            task_id,
            user_id: owner_id,
            correlation_id,
            payload,
        };

        match self.broker.publish(topic.as_str(), &envelope).await {
            Ok(()) => {
                tracing::debug!(
                    topic = topic.as_str(),
                    event_id = %envelope.event_id,
                    task_id = %task_id,
                    "published event"
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    topic = topic.as_str(),
                    task_id = %task_id,
                    error = %err,
                    "failed to publish event, continuing"
                );
                Err(PublishError::Broker(err))
            }
        }
    }
}
