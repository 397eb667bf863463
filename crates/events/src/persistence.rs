//! Durable change-event persistence.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and appends every [`ChangeEvent`] to `draft_form_events`. It exits when
//! the bus sender is dropped.

use chairside_core::types::DbId;
use chairside_db::models::draft_form_event::CreateDraftFormEvent;
use chairside_db::repositories::DraftFormEventRepo;
use chairside_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::ChangeEvent;

/// Background service that persists change events.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<ChangeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            table = %event.table,
                            record_id = event.record_id,
                            op = %event.op,
                            "Failed to persist change event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: &ChangeEvent) -> Result<DbId, sqlx::Error> {
        let mut payload = event.payload.clone();
        if let (Some(map), Some(version)) = (payload.as_object_mut(), event.version) {
            map.insert("version".to_string(), version.into());
        }

        DraftFormEventRepo::insert(
            pool,
            &CreateDraftFormEvent {
                table_name: event.table.clone(),
                record_id: event.record_id,
                operation: event.op.as_str().to_string(),
                status: event.status.clone(),
                actor_id: event.actor,
                payload,
            },
        )
        .await
    }
}
