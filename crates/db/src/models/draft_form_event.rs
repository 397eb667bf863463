use chairside_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `draft_form_events` audit table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DraftFormEvent {
    pub id: DbId,
    pub table_name: String,
    pub record_id: DbId,
    pub operation: String,
    pub status: Option<String>,
    pub actor_id: Option<Uuid>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

/// Insert DTO for the audit table.
#[derive(Debug, Clone)]
pub struct CreateDraftFormEvent {
    pub table_name: String,
    pub record_id: DbId,
    pub operation: String,
    pub status: Option<String>,
    pub actor_id: Option<Uuid>,
    pub payload: serde_json::Value,
}
