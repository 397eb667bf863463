//! Handlers for the feature-flag snapshot.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chairside_core::feature_flags::FeatureFlags;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /feature-flags
pub async fn get_flags(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let flags = state.feature_flags.current();
    Ok(Json(DataResponse {
        data: FeatureFlags::clone(&flags),
    }))
}

/// POST /admin/feature-flags/reload
///
/// Re-read the flags file. A bad file leaves the current snapshot in place.
pub async fn reload_flags(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let flags = state.feature_flags.reload().await?;
    tracing::info!(user_id = %admin.user_id, "Feature flags reloaded by admin");
    Ok(Json(DataResponse {
        data: FeatureFlags::clone(&flags),
    }))
}
