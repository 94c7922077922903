use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::typed_header::TypedHeader;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use transita_core::BookingView;

use crate::{auth::authenticate, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
struct ReserveRequest {
    seat_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(reserve_seat))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/users/{user_id}/bookings", get(list_user_bookings))
}

async fn reserve_seat(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<BookingView>), AppError> {
    let user_id = authenticate(&state, bearer.token())?;

    let view = state
        .engine
        .reserve(user_id, req.seat_id)
        .await
        .map_err(AppError::from_domain)?;

    info!(booking_id = %view.id, seat_id = %req.seat_id, "booking committed");
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_booking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingView>, AppError> {
    let caller = authenticate(&state, bearer.token())?;
    let view = state
        .ledger
        .get_booking(caller, id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(view))
}

async fn list_user_bookings(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<BookingView>>, AppError> {
    let caller = authenticate(&state, bearer.token())?;
    let views = state
        .ledger
        .list_bookings_for_user(caller, user_id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(views))
}
