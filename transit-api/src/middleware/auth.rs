use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Tokens are issued by the identity service; this service only verifies
/// them (HS256, shared secret).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

pub const ADMIN_ROLES: [&str; 2] = ["ADMIN", "SUPER_ADMIN"];

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => return AppError::AuthenticationError("missing bearer token".into()).into_response(),
    };

    let token_data = match decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!("Rejected admin token: {}", e);
            return AppError::AuthenticationError("invalid token".into()).into_response();
        }
    };

    if !ADMIN_ROLES.contains(&token_data.claims.role.as_str()) {
        return AppError::AuthorizationError(format!("role {} may not access this resource", token_data.claims.role))
            .into_response();
    }

    req.extensions_mut().insert(token_data.claims);
    next.run(req).await
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}
