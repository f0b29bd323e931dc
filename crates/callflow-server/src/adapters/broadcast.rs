//! In-process live event fan-out
//!
//! Backs the `/api/live` websocket. Events are not persisted here; the
//! database remains the record of what happened.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use callflow::EventPublisher;

/// One event as seen by live observers
#[derive(Debug, Clone, Serialize)]
pub struct LiveEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// EventPublisher backed by a tokio broadcast channel
pub struct BroadcastPublisher {
    tx: broadcast::Sender<LiveEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, kind: &str, payload: Value) {
        // No subscribers is not an error
        let _ = self.tx.send(LiveEvent {
            kind: kind.to_string(),
            data: payload,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish("call.answered", json!({ "call_id": "X" }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, "call.answered");
        assert_eq!(event.data["call_id"], "X");
    }

    #[test]
    fn test_publish_without_subscribers() {
        BroadcastPublisher::default().publish("delivery.queued", json!({}));
    }

    #[test]
    fn test_wire_shape() {
        let event = LiveEvent {
            kind: "call.digits".to_string(),
            data: json!({ "digits": "1" }),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "call.digits");
        assert!(value.get("timestamp").is_some());
    }
}
