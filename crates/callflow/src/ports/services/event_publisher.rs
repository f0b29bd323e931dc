//! Event Publisher Port
//!
//! Fire-and-forget fan-out of live events to observers. Publishing never
//! fails the operation that triggered it.

use serde_json::Value;

pub trait EventPublisher: Send + Sync {
    fn publish(&self, kind: &str, payload: Value);
}

/// Publisher that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _kind: &str, _payload: Value) {}
}
