//! Capability-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects with 403 when the caller's
//! role does not grant the named capability.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chairside_core::capabilities::Capability;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require(
    parts: &mut Parts,
    state: &AppState,
    capability: Capability,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    user.require(capability)?;
    Ok(user)
}

/// Requires `edit_forms`: open dialogs and auto-save drafts.
///
/// ```ignore
/// async fn autosave(RequireEditor(user): RequireEditor) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireEditor(pub AuthUser);

impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::EditForms)
            .await
            .map(RequireEditor)
    }
}

/// Requires `submit_forms`: finalize a form with its terminal status.
pub struct RequireSubmitter(pub AuthUser);

impl FromRequestParts<AppState> for RequireSubmitter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::SubmitForms)
            .await
            .map(RequireSubmitter)
    }
}

/// Requires `delete_records`.
pub struct RequireDeleter(pub AuthUser);

impl FromRequestParts<AppState> for RequireDeleter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::DeleteRecords)
            .await
            .map(RequireDeleter)
    }
}

/// Requires `manage_feature_flags` (admin only).
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, Capability::ManageFeatureFlags)
            .await
            .map(RequireAdmin)
    }
}
