use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::net::SocketAddr;
use transit_store::redis_repo::rate_limit_key;

use crate::state::AppState;

const WINDOW_SECONDS: i64 = 60;

/// Per-IP fixed window backed by Redis. Fails open when Redis is missing or
/// erroring.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let limit = state.business_rules.rate_limit_per_minute;
    let redis = match &state.redis {
        Some(redis) if limit > 0 => redis.clone(),
        _ => return next.run(req).await,
    };

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = rate_limit_key(&client, Utc::now().timestamp() / WINDOW_SECONDS);

    match redis.check_rate_limit(&key, limit, WINDOW_SECONDS).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!("Rate limit exceeded for {}", client);
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "RATE_LIMITED", "message": "Rate limit exceeded" })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            next.run(req).await
        }
    }
}
