//! Domain layer: the event envelope contract shared by every producer and
//! consumer in the fabric.

pub mod envelope;
pub mod timestamp;

pub use envelope::{
    EventEnvelope, EventPayload, FieldChange, OwnerId, TaskId, TaskSnapshot, TaskSnippet, Topic,
};
