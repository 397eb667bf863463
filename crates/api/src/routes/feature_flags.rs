use axum::routing::{get, post};
use axum::Router;

use crate::handlers::feature_flags;
use crate::state::AppState;

/// ```text
/// GET    /feature-flags                   -> get_flags
/// POST   /admin/feature-flags/reload      -> reload_flags
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feature-flags", get(feature_flags::get_flags))
        .route(
            "/admin/feature-flags/reload",
            post(feature_flags::reload_flags),
        )
}
