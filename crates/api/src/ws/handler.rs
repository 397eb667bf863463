use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chairside_core::autosave::DraftStore;
use chairside_core::capabilities::Capability;
use chairside_core::error::CoreError;
use chairside_core::feature_flags::FLAG_AUTOSAVE;
use chairside_core::forms::FormKind;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::ws::dialogs::DialogRegistry;
use crate::ws::manager::WsSender;
use crate::ws::messages::{ClientMessage, ServerMessage};

/// Browsers cannot set headers on a WebSocket upgrade, so the access token
/// travels in the query string.
#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    pub token: Option<String>,
}

/// HTTP handler that authenticates and upgrades the connection to WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsAuthParams>,
) -> AppResult<impl IntoResponse> {
    let token = params.token.ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Missing token query parameter".into(),
        ))
    })?;
    let user = AuthUser::from_token(&token, &state.config.jwt)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, spawns a sender task that drains the manager
/// channel into the sink, and dispatches inbound messages on this task
/// until the client disconnects.
async fn handle_socket(socket: WebSocket, state: AppState, user: AuthUser) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = %user.user_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone(), Some(user.user_id)).await;
    let Some(sender) = state.ws_manager.sender(&conn_id).await else {
        return;
    };

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    let store: Arc<dyn DraftStore> = Arc::new(state.draft_store(Some(user.user_id)));
    let mut dialogs = DialogRegistry::new(sender.clone(), store);

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(message) => {
                    dispatch(&state, &user, &conn_id, &sender, &mut dialogs, message).await;
                }
                Err(e) => {
                    let _ = sender.send(ServerMessage::error(format!("Invalid message: {e}")).to_ws());
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    let open_dialogs = dialogs.len();
    drop(dialogs);
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, open_dialogs, "WebSocket disconnected");
}

/// Handle one client message.
///
/// Auto-save snapshots reach the dialog's save queue before this returns,
/// so queue order is message order. Writes and submits run on the dialog's
/// worker and never block the read loop.
async fn dispatch(
    state: &AppState,
    user: &AuthUser,
    conn_id: &str,
    sender: &WsSender,
    dialogs: &mut DialogRegistry,
    message: ClientMessage,
) {
    let reply = |message: ServerMessage| {
        let _ = sender.send(message.to_ws());
    };

    match message {
        ClientMessage::DialogOpen {
            dialog_id,
            form_kind,
            initial,
        } => {
            if let Err(e) = user.require(Capability::EditForms) {
                reply(ServerMessage::error(e.to_string()));
                return;
            }
            dialogs.open(&dialog_id, form_kind, initial.as_ref());
        }

        ClientMessage::DialogAutoSave {
            dialog_id,
            snapshot,
        } => {
            if !state.feature_flags.is_enabled(FLAG_AUTOSAVE) {
                tracing::trace!(dialog_id = %dialog_id, "Auto-save disabled, ignoring");
                return;
            }
            if !dialogs.auto_save(&dialog_id, snapshot) {
                reply(ServerMessage::error(format!("Unknown dialog '{dialog_id}'")));
            }
        }

        ClientMessage::DialogSubmit {
            dialog_id,
            snapshot,
        } => {
            if let Err(e) = user.require(Capability::SubmitForms) {
                reply(ServerMessage::DialogSubmitFailed {
                    dialog_id,
                    error: e.to_string(),
                });
                return;
            }
            if !dialogs.submit(&dialog_id, snapshot) {
                reply(ServerMessage::error(format!("Unknown dialog '{dialog_id}'")));
            }
        }

        ClientMessage::DialogClose { dialog_id } => {
            if !dialogs.close(&dialog_id) {
                reply(ServerMessage::error(format!("Unknown dialog '{dialog_id}'")));
            }
        }

        ClientMessage::RealtimeSubscribe { table } => {
            if FormKind::from_table(&table).is_none() {
                reply(ServerMessage::error(format!("Unknown table '{table}'")));
                return;
            }
            state.ws_manager.subscribe(conn_id, &table).await;
            tracing::debug!(conn_id = %conn_id, table = %table, "Realtime subscription added");
        }

        ClientMessage::RealtimeUnsubscribe { table } => {
            state.ws_manager.unsubscribe(conn_id, &table).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chairside_core::autosave::{DraftWrite, SavedDraft};
    use chairside_core::error::CoreError;
    use chairside_core::feature_flags::FeatureFlags;
    use chairside_core::form_status::FormStatus;
    use chairside_core::forms::FormSnapshot;
    use chairside_events::EventBus;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    use super::*;
    use crate::auth::jwt::JwtConfig;
    use crate::config::ServerConfig;
    use crate::flags::FeatureFlagStore;
    use crate::ws::WsManager;

    /// Records every write and holds each one briefly so that later
    /// messages arrive while it is in flight.
    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(FormStatus, FormSnapshot)>>,
    }

    impl RecordingStore {
        fn writes(&self) -> Vec<(FormStatus, FormSnapshot)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DraftStore for RecordingStore {
        async fn upsert(&self, write: DraftWrite<'_>) -> Result<SavedDraft, CoreError> {
            tokio::time::sleep(Duration::from_millis(2)).await;
            let mut writes = self.writes.lock().unwrap();
            writes.push((write.status, write.snapshot.clone()));
            Ok(SavedDraft {
                id: 1,
                status: write.status,
                version: writes.len() as i32,
                created: writes.len() == 1,
                updated_at: chrono::Utc::now(),
            })
        }
    }

    fn test_state() -> AppState {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/chairside_unused")
            .unwrap();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            cors_origins: vec![],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            jwt: JwtConfig {
                secret: "test-secret-that-is-long-enough-for-hmac".into(),
                access_token_expiry_mins: 15,
            },
            feature_flags_path: None,
        };
        AppState {
            pool,
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
            event_bus: Arc::new(EventBus::default()),
            feature_flags: Arc::new(FeatureFlagStore::fixed(FeatureFlags::default())),
        }
    }

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::new_v4(),
            role: role.to_string(),
        }
    }

    async fn send(
        state: &AppState,
        user: &AuthUser,
        sender: &WsSender,
        dialogs: &mut DialogRegistry,
        message: Value,
    ) {
        let message: ClientMessage = serde_json::from_value(message).unwrap();
        dispatch(state, user, "conn-1", sender, dialogs, message).await;
    }

    async fn wait_for(rx: &mut mpsc::UnboundedReceiver<Message>, kind: &str) -> Value {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(Message::Text(text)) => {
                        let value: Value = serde_json::from_str(text.as_str()).unwrap();
                        if value["type"] == kind {
                            return value;
                        }
                    }
                    Some(_) => {}
                    None => panic!("connection channel closed"),
                }
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("no {kind} message within 5s"))
    }

    fn edit_index(snapshot: &FormSnapshot) -> usize {
        snapshot.get("patientName").and_then(Value::as_str).unwrap()["edit".len()..]
            .parse()
            .unwrap()
    }

    fn submission() -> Value {
        json!({
            "patientName": "Final",
            "procedureName": "Extraction #32",
            "patientSignature": "data:image/png;base64,AAAA"
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn autosave_burst_then_submit_is_written_in_message_order() {
        let state = test_state();
        let dentist = user("dentist");

        for _ in 0..20 {
            let store = Arc::new(RecordingStore::default());
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut dialogs = DialogRegistry::new(tx.clone(), store.clone());

            send(&state, &dentist, &tx, &mut dialogs, json!({
                "type": "dialog.open", "dialog_id": "d1", "form_kind": "consent"
            }))
            .await;
            for i in 0..8 {
                send(&state, &dentist, &tx, &mut dialogs, json!({
                    "type": "dialog.autosave",
                    "dialog_id": "d1",
                    "snapshot": {"patientName": format!("edit{i}")}
                }))
                .await;
            }
            send(&state, &dentist, &tx, &mut dialogs, json!({
                "type": "dialog.submit", "dialog_id": "d1", "snapshot": submission()
            }))
            .await;

            let submitted = wait_for(&mut rx, "dialog.submitted").await;
            assert_eq!(submitted["record"]["status"], "signed");

            let writes = store.writes();
            let (last_status, last_snapshot) = writes.last().unwrap();
            assert_eq!(*last_status, FormStatus::Signed);
            assert_eq!(last_snapshot, &FormSnapshot::from_value(submission()).unwrap());

            let drafts: Vec<usize> = writes[..writes.len() - 1]
                .iter()
                .map(|(status, snapshot)| {
                    assert_eq!(*status, FormStatus::Draft);
                    edit_index(snapshot)
                })
                .collect();
            assert_eq!(drafts.last(), Some(&7), "latest edit must be the last draft written");
            assert!(drafts.windows(2).all(|w| w[0] < w[1]), "drafts out of order: {drafts:?}");
        }
    }

    #[tokio::test]
    async fn submit_without_capability_fails_without_writing() {
        let state = test_state();
        let lab_tech = user("lab_tech");
        let store = Arc::new(RecordingStore::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dialogs = DialogRegistry::new(tx.clone(), store.clone());

        send(&state, &lab_tech, &tx, &mut dialogs, json!({
            "type": "dialog.open", "dialog_id": "d1", "form_kind": "consent"
        }))
        .await;
        send(&state, &lab_tech, &tx, &mut dialogs, json!({
            "type": "dialog.submit", "dialog_id": "d1", "snapshot": submission()
        }))
        .await;

        let failed = wait_for(&mut rx, "dialog.submit_failed").await;
        assert_eq!(failed["dialog_id"], "d1");
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn autosave_for_unknown_dialog_is_an_error() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dialogs = DialogRegistry::new(tx.clone(), Arc::new(RecordingStore::default()));

        send(&state, &user("dentist"), &tx, &mut dialogs, json!({
            "type": "dialog.autosave", "dialog_id": "nope", "snapshot": {"patientName": "A"}
        }))
        .await;

        let error = wait_for(&mut rx, "error").await;
        assert!(error["message"].as_str().unwrap().contains("nope"));
    }
}
