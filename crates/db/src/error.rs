use chairside_core::error::CoreError;
use chairside_core::types::DbId;

/// Failure modes of [`DraftFormRepo::upsert`](crate::repositories::DraftFormRepo::upsert).
#[derive(Debug, thiserror::Error)]
pub enum DraftWriteError {
    #[error("{table} record {id} not found")]
    NotFound { table: &'static str, id: DbId },

    #[error("{table} record {id} is at version {actual}, expected {expected}")]
    VersionConflict {
        table: &'static str,
        id: DbId,
        expected: i32,
        actual: i32,
    },

    #[error(transparent)]
    Mapping(CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<DraftWriteError> for CoreError {
    fn from(err: DraftWriteError) -> Self {
        match err {
            DraftWriteError::NotFound { id, .. } => CoreError::NotFound {
                entity: "DraftForm",
                id,
            },
            DraftWriteError::VersionConflict { .. } => CoreError::Conflict(err.to_string()),
            DraftWriteError::Mapping(core) => core,
            DraftWriteError::Database(db) => CoreError::Internal(db.to_string()),
        }
    }
}
