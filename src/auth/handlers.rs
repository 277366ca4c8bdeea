use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::SessionKeys;
use crate::auth::services;
use crate::error::AppError;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = SessionKeys::from_ref(&state);
    let (token, user) = services::register_user(
        &state.db,
        &keys,
        &payload.name,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok(Json(AuthResponse { token, user }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = SessionKeys::from_ref(&state);
    let (token, user) =
        services::login_user(&state.db, &keys, &payload.email, &payload.password).await?;
    Ok(Json(AuthResponse { token, user }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::load_profile(&state.db, user_id).await?;
    Ok(Json(user))
}
