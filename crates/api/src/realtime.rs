//! Change-event fan-out to subscribed WebSocket clients.
//!
//! [`RealtimeRouter`] consumes the event bus and forwards each
//! [`ChangeEvent`] as a `realtime.change` message to every connection that
//! subscribed to the event's table.

use std::sync::Arc;

use chairside_core::feature_flags::FLAG_REALTIME;
use chairside_events::ChangeEvent;
use tokio::sync::broadcast;

use crate::flags::FeatureFlagStore;
use crate::ws::messages::ServerMessage;
use crate::ws::WsManager;

pub struct RealtimeRouter {
    ws_manager: Arc<WsManager>,
    feature_flags: Arc<FeatureFlagStore>,
}

impl RealtimeRouter {
    pub fn new(ws_manager: Arc<WsManager>, feature_flags: Arc<FeatureFlagStore>) -> Self {
        Self {
            ws_manager,
            feature_flags,
        }
    }

    /// Run the routing loop until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<ChangeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.route_event(event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Realtime router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, realtime router shutting down");
                    break;
                }
            }
        }
    }

    /// Deliver one event. Returns the number of connections reached.
    pub async fn route_event(&self, event: ChangeEvent) -> usize {
        if !self.feature_flags.is_enabled(FLAG_REALTIME) {
            return 0;
        }
        let table = event.table.clone();
        let record_id = event.record_id;
        let message = ServerMessage::RealtimeChange { event }.to_ws();
        let delivered = self.ws_manager.send_to_subscribers(&table, message).await;
        tracing::trace!(table = %table, record_id, delivered, "Change event routed");
        delivered
    }
}
