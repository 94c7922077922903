use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use transita_core::{Seat, Trip, TripSpec, TripUpdate};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", get(list_trips).post(create_trip))
        .route(
            "/v1/trips/{id}",
            get(get_trip).patch(update_trip).delete(delete_trip),
        )
        .route("/v1/trips/{id}/seats", get(list_seats))
        .route("/v1/seats/{id}", get(get_seat))
}

async fn create_trip(
    State(state): State<AppState>,
    Json(spec): Json<TripSpec>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let trip = state
        .inventory
        .create_trip(spec)
        .await
        .map_err(AppError::from_domain)?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    let trips = state
        .inventory
        .list_trips()
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(trips))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .inventory
        .get_trip(id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(trip))
}

async fn update_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TripUpdate>,
) -> Result<Json<Trip>, AppError> {
    let trip = state
        .inventory
        .update_trip(id, changes)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(trip))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .inventory
        .delete_trip(id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_seats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Seat>>, AppError> {
    let seats = state
        .inventory
        .list_seats(id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(seats))
}

async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Seat>, AppError> {
    let seat = state
        .inventory
        .get_seat(id)
        .await
        .map_err(AppError::from_domain)?;
    Ok(Json(seat))
}
