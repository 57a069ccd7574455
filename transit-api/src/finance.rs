use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use transit_booking::{IncomeMonth, MonthlyIncome};
use transit_core::Booking;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{AppPath, AppQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IncomeQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct BreakdownQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

fn default_months() -> u32 {
    6
}

/// Bus-level reporting; mounted behind the admin token check.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/buses/{bus_id}/income", get(monthly_income))
        .route("/v1/buses/{bus_id}/income/breakdown", get(income_breakdown))
        .route("/v1/buses/{bus_id}/bookings", get(bus_bookings))
}

/// GET /v1/buses/{bus_id}/income?year=&month=
async fn monthly_income(
    State(state): State<AppState>,
    AppPath(bus_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<IncomeQuery>,
) -> Result<Json<MonthlyIncome>, AppError> {
    Ok(Json(state.services.income.monthly_income(bus_id, query.year, query.month).await?))
}

/// GET /v1/buses/{bus_id}/income/breakdown?months=
async fn income_breakdown(
    State(state): State<AppState>,
    AppPath(bus_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<BreakdownQuery>,
) -> Result<Json<Vec<IncomeMonth>>, AppError> {
    Ok(Json(state.services.income.income_breakdown(bus_id, query.months).await?))
}

/// GET /v1/buses/{bus_id}/bookings
async fn bus_bookings(State(state): State<AppState>, AppPath(bus_id): AppPath<Uuid>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.services.reservations.bookings_for_bus(bus_id).await?))
}
