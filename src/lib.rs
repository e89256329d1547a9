//! Taskwave's event-driven coordination fabric: the event contract, the
//! publisher abstraction every producer goes through, and the four
//! sidecar workers that react to task lifecycle events -- reminder
//! scheduling, SSE notification fan-out, audit ingestion, and
//! recurring-task materialization.

pub mod audit;
pub mod domain;
pub mod infrastructure;
pub mod notifier;
pub mod publisher;
pub mod recurrence;
pub mod recurring_generator;
pub mod reminder_engine;
