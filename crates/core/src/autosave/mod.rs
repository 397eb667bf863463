//! Auto-save coordination for multi-step form dialogs.
//!
//! - [`AutoSaveController`]: one per open dialog; owns save-state, the
//!   cached record id and dirty tracking.
//! - [`SaveQueue`]: single-slot pending buffer with an in-flight guard.
//! - [`DraftStore`]: the create-or-update persistence call.

mod controller;
mod queue;
mod state;
mod store;

use std::time::Duration;

use crate::error::CoreError;

pub use controller::{resolve_record_id, AutoSaveController, AutoSaveOutcome, Enqueued};
pub use queue::{QueueState, SaveQueue};
pub use state::{SaveStateView, SaveStatus};
pub use store::{DraftStore, DraftWrite, SavedDraft};

/// How long an error banner stays up before returning to idle.
pub const ERROR_CLEAR_DELAY: Duration = Duration::from_millis(5000);

pub const SAVING_MESSAGE: &str = "Saving...";
pub const SAVED_MESSAGE: &str = "All changes saved";

/// Errors returned by [`AutoSaveController::on_submit`].
#[derive(Debug, thiserror::Error)]
pub enum AutoSaveError {
    /// Required fields are missing; nothing was written.
    #[error(transparent)]
    Validation(CoreError),

    /// The store rejected or failed the write.
    #[error("Save failed: {0}")]
    Store(CoreError),
}

impl AutoSaveError {
    pub fn into_core(self) -> CoreError {
        match self {
            AutoSaveError::Validation(e) | AutoSaveError::Store(e) => e,
        }
    }
}
