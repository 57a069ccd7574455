use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use transit_booking::NewAssignment;
use transit_core::RouteAssignment;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::AdminClaims;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/admin/assignments", post(create_assignment))
}

/// POST /v1/admin/assignments
async fn create_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<AdminClaims>,
    AppJson(req): AppJson<NewAssignment>,
) -> Result<(StatusCode, Json<RouteAssignment>), AppError> {
    tracing::info!("Admin {} scheduling bus {} on route {}", claims.sub, req.bus_id, req.route_id);
    let assignment = state.services.scheduler.create_assignment(req).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}
