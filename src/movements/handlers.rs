use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::extractors::AuthUser;
use crate::error::AppError;
use crate::movements::dto::{CreatedMovementResponse, MovementsResponse, NewMovementRequest};
use crate::movements::services::{
    convert_rows_to_movements, group_movements_by_date, record_movement, validate_movement_input,
    MovementKind,
};
use crate::movements::{balance, repo};
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/movements", get(list_movements))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/movements", post(create_movement))
}

/// GET /movements: the recent movements for the current user, grouped by
/// date, along with a balance recomputed from the same rows.
#[instrument(skip(state))]
pub async fn list_movements(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MovementsResponse>, AppError> {
    let rows = repo::list_recent_by_owner(&state.db, user_id).await?;
    let movements = convert_rows_to_movements(&rows);
    let groups = group_movements_by_date(&movements);
    let balance = balance::compute_balance_from_rows(&rows, user_id);
    Ok(Json(MovementsResponse { balance, groups }))
}

/// POST /movements: validates the entry, stores the record and applies the
/// incremental balance update.
#[instrument(skip(state, payload))]
pub async fn create_movement(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<NewMovementRequest>,
) -> Result<(StatusCode, Json<CreatedMovementResponse>), AppError> {
    validate_movement_input(
        &payload.kind,
        &payload.name,
        payload.value,
        payload.total_amount,
        payload.monthly_payment,
        payload.term_months,
    )
    .into_result()?;
    let kind = MovementKind::from_raw(&payload.kind)
        .ok_or_else(|| AppError::Validation(format!("invalid movement kind: {}", payload.kind)))?;

    let (row, balance) = record_movement(
        &state.db,
        user_id,
        kind,
        &payload.name,
        payload.value,
        payload.total_amount,
        payload.monthly_payment,
        payload.term_months,
    )
    .await?;

    let movement = convert_rows_to_movements(std::slice::from_ref(&row))
        .pop()
        .ok_or_else(|| AppError::Store(anyhow::anyhow!("freshly built movement did not convert")))?;

    info!(user_id = %user_id, kind = %kind.as_str(), "movement added");
    Ok((
        StatusCode::CREATED,
        Json(CreatedMovementResponse { movement, balance }),
    ))
}
