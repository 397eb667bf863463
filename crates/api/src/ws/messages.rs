//! JSON messages exchanged over the dialog WebSocket.
//!
//! Every message is an object with a `"type"` tag, e.g.
//! `{"type": "dialog.autosave", "dialog_id": "consent-1", "snapshot": {...}}`.

use axum::extract::ws::Message;
use chairside_core::autosave::{SaveStateView, SavedDraft};
use chairside_core::forms::{FormKind, FormSnapshot};
use chairside_events::ChangeEvent;
use serde::{Deserialize, Serialize};

/// Client -> server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Open (or reopen) a dialog. `initial` seeds the record id.
    #[serde(rename = "dialog.open")]
    DialogOpen {
        dialog_id: String,
        form_kind: FormKind,
        #[serde(default)]
        initial: Option<FormSnapshot>,
    },
    #[serde(rename = "dialog.autosave")]
    DialogAutoSave {
        dialog_id: String,
        snapshot: FormSnapshot,
    },
    #[serde(rename = "dialog.submit")]
    DialogSubmit {
        dialog_id: String,
        snapshot: FormSnapshot,
    },
    #[serde(rename = "dialog.close")]
    DialogClose { dialog_id: String },
    #[serde(rename = "realtime.subscribe")]
    RealtimeSubscribe { table: String },
    #[serde(rename = "realtime.unsubscribe")]
    RealtimeUnsubscribe { table: String },
}

/// Server -> client.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Save indicator changed.
    #[serde(rename = "dialog.state")]
    DialogState {
        dialog_id: String,
        state: SaveStateView,
    },
    #[serde(rename = "dialog.submitted")]
    DialogSubmitted {
        dialog_id: String,
        record: SavedDraft,
    },
    #[serde(rename = "dialog.submit_failed")]
    DialogSubmitFailed { dialog_id: String, error: String },
    #[serde(rename = "realtime.change")]
    RealtimeChange { event: ChangeEvent },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Encode as a text frame.
    pub fn to_ws(&self) -> Message {
        match serde_json::to_string(self) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode WebSocket message");
                Message::Text(r#"{"type":"error","message":"encoding failed"}"#.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_dialog_open_with_initial_snapshot() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "dialog.open",
            "dialog_id": "d1",
            "form_kind": "consent",
            "initial": {"id": 42, "patientName": "Ana"}
        }))
        .unwrap();

        match msg {
            ClientMessage::DialogOpen {
                dialog_id,
                form_kind,
                initial,
            } => {
                assert_eq!(dialog_id, "d1");
                assert_eq!(form_kind, FormKind::Consent);
                assert_eq!(initial.and_then(|s| s.record_id()), Some(42));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn open_without_initial_is_allowed() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "dialog.open",
            "dialog_id": "d1",
            "form_kind": "lab_prescription"
        }))
        .unwrap();
        assert!(matches!(msg, ClientMessage::DialogOpen { initial: None, .. }));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_value::<ClientMessage>(json!({"type": "dialog.explode"}));
        assert!(result.is_err());
    }

    #[test]
    fn server_messages_carry_type_tag() {
        let value = serde_json::to_value(ServerMessage::DialogSubmitFailed {
            dialog_id: "d1".into(),
            error: "Save failed: boom".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "dialog.submit_failed");
        assert_eq!(value["dialog_id"], "d1");
        assert_eq!(value["error"], "Save failed: boom");
    }
}
