use axum::{extract::FromRequestParts, http::header};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Role, UserSummary},
    services::auth_service::verify_token,
    state::AppState,
};

/// Identity of the caller, taken from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

impl From<AuthUser> for UserSummary {
    fn from(user: AuthUser) -> Self {
        UserSummary {
            id: user.user_id,
            username: user.username,
            role: user.role,
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        verify_token(&state.keys, token)
    }
}
