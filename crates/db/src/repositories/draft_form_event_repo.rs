//! Repository for the `draft_form_events` audit table.

use chairside_core::types::DbId;
use sqlx::PgPool;

use crate::models::draft_form_event::{CreateDraftFormEvent, DraftFormEvent};

const COLUMNS: &str =
    "id, table_name, record_id, operation, status, actor_id, payload, created_at";

pub struct DraftFormEventRepo;

impl DraftFormEventRepo {
    /// Insert an audit row, returning the generated ID.
    pub async fn insert(pool: &PgPool, input: &CreateDraftFormEvent) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO draft_form_events \
                (table_name, record_id, operation, status, actor_id, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(&input.table_name)
        .bind(input.record_id)
        .bind(&input.operation)
        .bind(&input.status)
        .bind(input.actor_id)
        .bind(&input.payload)
        .fetch_one(pool)
        .await
    }

    /// History of one record, newest first.
    pub async fn list_for_record(
        pool: &PgPool,
        table_name: &str,
        record_id: DbId,
        limit: i64,
    ) -> Result<Vec<DraftFormEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM draft_form_events \
             WHERE table_name = $1 AND record_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, DraftFormEvent>(&query)
            .bind(table_name)
            .bind(record_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
