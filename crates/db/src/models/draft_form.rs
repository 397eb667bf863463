//! Draft form entity shared by every per-kind form table.

use chairside_core::form_status::FormStatus;
use chairside_core::forms::FormSnapshot;
use chairside_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row from any of the form tables (`consent_forms`, `lab_prescriptions`, ...).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DraftForm {
    pub id: DbId,
    pub patient_id: Option<DbId>,
    pub lead_id: Option<DbId>,
    pub packet_id: Option<DbId>,
    pub form_data: serde_json::Value,
    pub status: String,
    pub version: i32,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DraftForm {
    /// Parse the stored status. The table CHECK constraint keeps this valid.
    pub fn form_status(&self) -> Result<FormStatus, String> {
        self.status.parse()
    }
}

/// Input for [`DraftFormRepo::upsert`](crate::repositories::DraftFormRepo::upsert).
#[derive(Debug, Clone, Copy)]
pub struct UpsertDraftForm<'a> {
    pub snapshot: &'a FormSnapshot,
    /// Row to update; `None` inserts.
    pub existing_id: Option<DbId>,
    pub status: FormStatus,
    /// Compare-and-swap guard on the row version.
    pub expected_version: Option<i32>,
    pub actor: Option<Uuid>,
}

/// Result of an upsert: the stored row and whether it was inserted.
#[derive(Debug, Clone)]
pub struct UpsertedDraftForm {
    pub row: DraftForm,
    pub created: bool,
}

/// Query filters for listing form records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftFormFilter {
    pub patient_id: Option<DbId>,
    pub lead_id: Option<DbId>,
    pub packet_id: Option<DbId>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Row count for one status value.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}
