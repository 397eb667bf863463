//! Route definitions for form records.
//!
//! Mounted at `/forms` by `api_routes()`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::forms;
use crate::state::AppState;

/// ```text
/// GET    /                                -> list_kinds
/// GET    /{kind}/stats                    -> status_counts
/// GET    /{kind}/records                  -> list_records
/// PUT    /{kind}/records/autosave         -> autosave
/// POST   /{kind}/records/submit           -> submit
/// GET    /{kind}/records/{id}             -> get_record
/// DELETE /{kind}/records/{id}             -> delete_record
/// GET    /{kind}/records/{id}/history     -> record_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(forms::list_kinds))
        .route("/{kind}/stats", get(forms::status_counts))
        .route("/{kind}/records", get(forms::list_records))
        .route("/{kind}/records/autosave", put(forms::autosave))
        .route("/{kind}/records/submit", post(forms::submit))
        .route(
            "/{kind}/records/{id}",
            get(forms::get_record).delete(forms::delete_record),
        )
        .route("/{kind}/records/{id}/history", get(forms::record_history))
}
