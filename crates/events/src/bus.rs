//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application. Every
//! successful form write publishes a [`ChangeEvent`]; persistence and the
//! realtime router each hold their own receiver.

use std::fmt;

use chairside_core::types::{DbId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ChangeEvent
// ---------------------------------------------------------------------------

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOp::Insert => "INSERT",
            ChangeOp::Update => "UPDATE",
            ChangeOp::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed change to one form record.
///
/// Built with [`ChangeEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,

    /// Table the record lives in, e.g. `"consent_forms"`.
    pub table: String,

    pub record_id: DbId,

    /// Stored status after the write. `None` for deletes.
    pub status: Option<String>,

    /// Row version after the write. `None` for deletes.
    pub version: Option<i32>,

    /// User that made the change.
    pub actor: Option<Uuid>,

    /// Extra event data.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl ChangeEvent {
    pub fn new(op: ChangeOp, table: impl Into<String>, record_id: DbId) -> Self {
        Self {
            op,
            table: table.into(),
            record_id,
            status: None,
            version: None,
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the stored status and version.
    pub fn with_status(mut self, status: impl Into<String>, version: i32) -> Self {
        self.status = Some(status.into());
        self.version = Some(version);
        self
    }

    pub fn with_actor(mut self, actor: Option<Uuid>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use chairside_events::bus::{ChangeEvent, ChangeOp, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(ChangeEvent::new(ChangeOp::Insert, "consent_forms", 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Events published with no subscribers are dropped.
    pub fn publish(&self, event: ChangeEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let actor = Uuid::new_v4();

        bus.publish(
            ChangeEvent::new(ChangeOp::Update, "consent_forms", 42)
                .with_status("signed", 3)
                .with_actor(Some(actor))
                .with_payload(serde_json::json!({"form_kind": "consent"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.op, ChangeOp::Update);
        assert_eq!(received.table, "consent_forms");
        assert_eq!(received.record_id, 42);
        assert_eq!(received.status.as_deref(), Some("signed"));
        assert_eq!(received.version, Some(3));
        assert_eq!(received.actor, Some(actor));
        assert_eq!(received.payload["form_kind"], "consent");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(ChangeEvent::new(ChangeOp::Delete, "lab_prescriptions", 7));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.record_id, 7);
        assert_eq!(e2.record_id, 7);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(ChangeEvent::new(ChangeOp::Insert, "warranty_forms", 1));
    }

    #[test]
    fn op_serializes_uppercase() {
        let event = ChangeEvent::new(ChangeOp::Insert, "warranty_forms", 1);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["op"], "INSERT");
        assert!(json["status"].is_null());
    }
}
