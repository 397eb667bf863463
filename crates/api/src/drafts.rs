//! Postgres-backed [`DraftStore`] that announces every write on the event bus.

use std::sync::Arc;

use async_trait::async_trait;
use chairside_core::autosave::{DraftStore, DraftWrite, SavedDraft};
use chairside_core::error::CoreError;
use chairside_core::forms::FormSchema;
use chairside_core::types::DbId;
use chairside_db::models::draft_form::{UpsertDraftForm, UpsertedDraftForm};
use chairside_db::repositories::DraftFormRepo;
use chairside_db::DbPool;
use chairside_events::{ChangeEvent, ChangeOp, EventBus};
use serde_json::json;
use uuid::Uuid;

/// Draft store used by REST handlers and WebSocket dialogs.
///
/// One instance per acting user; the actor is stamped on rows and events.
pub struct PgDraftStore {
    pool: DbPool,
    event_bus: Arc<EventBus>,
    actor: Option<Uuid>,
}

impl PgDraftStore {
    pub fn new(pool: DbPool, event_bus: Arc<EventBus>, actor: Option<Uuid>) -> Self {
        Self {
            pool,
            event_bus,
            actor,
        }
    }

    /// Delete a record and publish the change. Returns `false` if absent.
    pub async fn delete(&self, schema: &'static FormSchema, id: DbId) -> Result<bool, sqlx::Error> {
        let deleted = DraftFormRepo::delete(&self.pool, schema, id).await?;
        if deleted {
            self.event_bus.publish(
                ChangeEvent::new(ChangeOp::Delete, schema.table, id)
                    .with_actor(self.actor)
                    .with_payload(json!({ "form_kind": schema.kind })),
            );
        }
        Ok(deleted)
    }

    fn publish_write(&self, schema: &'static FormSchema, upserted: &UpsertedDraftForm) {
        let op = if upserted.created {
            ChangeOp::Insert
        } else {
            ChangeOp::Update
        };
        self.event_bus.publish(
            ChangeEvent::new(op, schema.table, upserted.row.id)
                .with_status(upserted.row.status.clone(), upserted.row.version)
                .with_actor(self.actor)
                .with_payload(json!({ "form_kind": schema.kind })),
        );
    }
}

#[async_trait]
impl DraftStore for PgDraftStore {
    async fn upsert(&self, write: DraftWrite<'_>) -> Result<SavedDraft, CoreError> {
        let upserted = DraftFormRepo::upsert(
            &self.pool,
            write.schema,
            &UpsertDraftForm {
                snapshot: write.snapshot,
                existing_id: write.existing_id,
                status: write.status,
                expected_version: write.expected_version,
                actor: self.actor,
            },
        )
        .await?;

        self.publish_write(write.schema, &upserted);

        let status = upserted.row.form_status().map_err(CoreError::Internal)?;
        Ok(SavedDraft {
            id: upserted.row.id,
            status,
            version: upserted.row.version,
            created: upserted.created,
            updated_at: upserted.row.updated_at,
        })
    }
}
