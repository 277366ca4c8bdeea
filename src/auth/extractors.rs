use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::jwt::SessionKeys;
use crate::error::AppError;
use crate::state::AppState;

/// Extracts and verifies the Bearer session token, yielding the user ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Token)?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(AppError::Token)?;

        let keys = SessionKeys::from_ref(state);
        match keys.verify(token) {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => Err(AppError::Token),
        }
    }
}
