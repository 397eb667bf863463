//! Save-state view model shown next to a form dialog.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// Save indicator status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// Everything the status indicator renders. Client-only, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveStateView {
    pub status: SaveStatus,
    pub message: String,
    pub last_saved_at: Option<Timestamp>,
    /// `last_saved_at` in US Eastern wall-clock time.
    pub last_saved_display: Option<String>,
    pub record_id: Option<DbId>,
    pub dirty: bool,
}

impl SaveStateView {
    /// Fresh state for a dialog that was just opened.
    pub fn opened(record_id: Option<DbId>) -> Self {
        Self {
            record_id,
            ..Self::default()
        }
    }
}
