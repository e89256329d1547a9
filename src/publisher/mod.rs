//! Publisher abstraction: the sole path by which producers put events on
//! the bus.

mod broker;
mod publisher;

pub use broker::{BrokerError, DaprHttpBroker, NoopBroker, PubSubBroker};
pub use publisher::{PublishError, Publisher};
