use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use chairside_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Authenticated user, if known.
    pub user_id: Option<Uuid>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    pub connected_at: Timestamp,
    /// Tables whose change events this connection receives.
    pub subscriptions: HashSet<String>,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; wrap in `Arc` and share.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        user_id: Option<Uuid>,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
            subscriptions: HashSet::new(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
            tracing::debug!(conn_id = %conn_id, connected_secs, "Connection removed");
        }
    }

    /// Sender for one connection, for tasks that push to it directly.
    pub async fn sender(&self, conn_id: &str) -> Option<WsSender> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|conn| conn.sender.clone())
    }

    /// Start delivering change events for `table`. Returns `false` for an
    /// unknown connection.
    pub async fn subscribe(&self, conn_id: &str, table: &str) -> bool {
        match self.connections.write().await.get_mut(conn_id) {
            Some(conn) => {
                conn.subscriptions.insert(table.to_string());
                true
            }
            None => false,
        }
    }

    pub async fn unsubscribe(&self, conn_id: &str, table: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.subscriptions.remove(table);
        }
    }

    /// Send a message to every connection subscribed to `table`.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_subscribers(&self, table: &str, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.subscriptions.contains(table)) {
            let _ = conn.sender.send(message.clone());
            count += 1;
        }
        count
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
