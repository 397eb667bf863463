//! Persistence seam used by the auto-save controller.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::form_status::FormStatus;
use crate::forms::{FormSchema, FormSnapshot};
use crate::types::{DbId, Timestamp};

/// One create-or-update request.
#[derive(Debug, Clone, Copy)]
pub struct DraftWrite<'a> {
    pub schema: &'static FormSchema,
    pub snapshot: &'a FormSnapshot,
    /// Row to update; `None` inserts a new row.
    pub existing_id: Option<DbId>,
    /// Requested status. Stores must never let a non-terminal status
    /// overwrite a terminal one.
    pub status: FormStatus,
    /// When set, the update only applies if the row is at this version.
    pub expected_version: Option<i32>,
}

/// What a store reports back after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedDraft {
    pub id: DbId,
    /// Status actually stored, after the terminal-status guard.
    pub status: FormStatus,
    pub version: i32,
    /// `true` when the write inserted a new row.
    pub created: bool,
    pub updated_at: Timestamp,
}

/// Create-or-update persistence for draft form records.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Update `write.existing_id` when present, otherwise insert.
    ///
    /// Updating a missing row is `CoreError::NotFound`; a version mismatch
    /// is `CoreError::Conflict`.
    async fn upsert(&self, write: DraftWrite<'_>) -> Result<SavedDraft, CoreError>;
}
