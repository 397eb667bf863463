//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chairside_core::capabilities::{role_has_capability, validate_role, Capability};
use chairside_core::error::CoreError;
use uuid::Uuid;

use crate::auth::jwt::{validate_token, JwtConfig};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's id in the hosted auth provider (from `claims.sub`).
    pub user_id: Uuid,
    /// Application role (e.g. `"dentist"`, `"lab_tech"`).
    pub role: String,
}

impl AuthUser {
    /// Authenticate a raw token string (without the `Bearer ` prefix).
    ///
    /// Tokens carrying a role outside [`VALID_ROLES`](chairside_core::capabilities::VALID_ROLES)
    /// are rejected.
    pub fn from_token(token: &str, config: &JwtConfig) -> Result<Self, AppError> {
        let claims = validate_token(token, config).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;
        validate_role(&claims.role).map_err(|msg| AppError::Core(CoreError::Unauthorized(msg)))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }

    pub fn can(&self, capability: Capability) -> bool {
        role_has_capability(&self.role, capability)
    }

    /// `Forbidden` unless the role grants `capability`.
    pub fn require(&self, capability: Capability) -> Result<(), CoreError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' lacks the {capability} capability",
                self.role
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        Self::from_token(token, &state.config.jwt)
    }
}
