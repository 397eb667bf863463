pub mod feature_flags;
pub mod forms;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                          WebSocket (?token=)
///
/// /forms                                       form catalog
/// /forms/{kind}/stats                          record counts per status
/// /forms/{kind}/records                        list (?patient_id, lead_id, packet_id, status, limit, offset)
/// /forms/{kind}/records/autosave               draft upsert (PUT)
/// /forms/{kind}/records/submit                 terminal upsert (POST)
/// /forms/{kind}/records/{id}                   get, delete
/// /forms/{kind}/records/{id}/history           change events
///
/// /feature-flags                               current snapshot
/// /admin/feature-flags/reload                  reload snapshot (POST, admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/forms", forms::router())
        .merge(feature_flags::router())
}
