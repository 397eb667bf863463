use std::sync::Arc;

use chairside_events::EventBus;

use crate::config::ServerConfig;
use crate::drafts::PgDraftStore;
use crate::flags::FeatureFlagStore;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything shared sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: chairside_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Change events for every form write.
    pub event_bus: Arc<EventBus>,
    /// Current feature-flag snapshot holder.
    pub feature_flags: Arc<FeatureFlagStore>,
}

impl AppState {
    /// A draft store acting on behalf of `actor`.
    pub fn draft_store(&self, actor: Option<uuid::Uuid>) -> PgDraftStore {
        PgDraftStore::new(self.pool.clone(), Arc::clone(&self.event_bus), actor)
    }
}
