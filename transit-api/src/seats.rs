use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use transit_booking::{SeatStatusSummary, SeatView};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{AppPath, AppQuery};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupiedSeatsResponse {
    pub occupied_seats: Vec<u32>,
}

impl From<BTreeSet<u32>> for OccupiedSeatsResponse {
    fn from(seats: BTreeSet<u32>) -> Self {
        Self {
            occupied_seats: seats.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub date: NaiveDate,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/routes/{assignment_id}/occupied-seats", get(occupied_for_assignment))
        .route("/v1/occupied-seats", get(occupied_for_slot))
        .route("/v1/assignments/{assignment_id}/seats", get(seat_map))
        .route("/v1/assignments/{assignment_id}/seat-status", get(seat_status))
}

/// GET /v1/routes/{assignment_id}/occupied-seats
async fn occupied_for_assignment(
    State(state): State<AppState>,
    AppPath(assignment_id): AppPath<Uuid>,
) -> Result<Json<OccupiedSeatsResponse>, AppError> {
    let seats = state.services.occupancy.occupied_for_assignment(assignment_id).await?;
    Ok(Json(seats.into()))
}

/// GET /v1/occupied-seats?busId=&routeId=&date=
async fn occupied_for_slot(
    State(state): State<AppState>,
    AppQuery(slot): AppQuery<SlotQuery>,
) -> Result<Json<OccupiedSeatsResponse>, AppError> {
    let seats = state
        .services
        .occupancy
        .occupied_seats(slot.bus_id, slot.route_id, slot.date)
        .await?;
    Ok(Json(seats.into()))
}

/// GET /v1/assignments/{assignment_id}/seats
async fn seat_map(
    State(state): State<AppState>,
    AppPath(assignment_id): AppPath<Uuid>,
) -> Result<Json<Vec<SeatView>>, AppError> {
    Ok(Json(state.services.occupancy.seat_view(assignment_id).await?))
}

/// GET /v1/assignments/{assignment_id}/seat-status
async fn seat_status(
    State(state): State<AppState>,
    AppPath(assignment_id): AppPath<Uuid>,
) -> Result<Json<SeatStatusSummary>, AppError> {
    Ok(Json(state.services.occupancy.seat_status(assignment_id).await?))
}
