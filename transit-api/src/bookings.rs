use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use transit_booking::ReserveRequest;
use transit_core::{Booking, BookingError, PassengerDetails, Payment};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub route_assignment_id: Uuid,
    pub seat_numbers: Vec<i64>,
    pub passenger: PassengerDetails,
    /// Display total from the client; the server always reprices.
    pub total_price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PassengerQuery {
    pub email: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_passenger_bookings))
        .route("/v1/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route("/v1/bookings/{id}/payments", get(list_payments))
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let result = state
        .services
        .reservations
        .reserve_seats(ReserveRequest {
            assignment_id: req.route_assignment_id,
            seat_numbers: req.seat_numbers,
            passenger: req.passenger,
            client_total: req.total_price,
        })
        .await;

    match result {
        Ok(booking) => Ok((StatusCode::CREATED, Json(booking))),
        Err(e) => {
            if matches!(e, BookingError::SeatConflict { .. }) {
                state.metrics.seat_conflicts.inc();
            }
            Err(e.into())
        }
    }
}

/// GET /v1/bookings/{id}
async fn get_booking(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.services.reservations.get_booking(id).await?))
}

/// DELETE /v1/bookings/{id}
async fn cancel_booking(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.services.reservations.cancel_booking(id).await?))
}

/// GET /v1/bookings?email=
async fn list_passenger_bookings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PassengerQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.services.reservations.bookings_for_passenger(&query.email).await?))
}

/// GET /v1/bookings/{id}/payments
async fn list_payments(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.services.payments.payments_for_booking(id).await?))
}
