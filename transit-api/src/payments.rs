use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use transit_core::{Booking, BookingError, PaymentResult, PaymentStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

/// Payment-provider callback. Providers retry, so every outcome is
/// idempotent per booking.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallback {
    pub booking_id: Uuid,
    pub method: String,
    pub provider_transaction_id: String,
    pub amount: i64,
    #[serde(default)]
    pub status: Option<PaymentStatus>,
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/payments", post(record_payment))
}

/// POST /v1/payments
async fn record_payment(
    State(state): State<AppState>,
    AppJson(req): AppJson<PaymentCallback>,
) -> Result<Json<Booking>, AppError> {
    let reconciler = &state.services.payments;

    match req.status.unwrap_or(PaymentStatus::Completed) {
        PaymentStatus::Completed => {
            let result = reconciler
                .confirm_payment(
                    req.booking_id,
                    PaymentResult {
                        method: req.method,
                        provider_transaction_id: req.provider_transaction_id,
                        amount: req.amount,
                    },
                )
                .await;

            // Confirmations and expiries are counted from the applied-transition events.
            if let Err(BookingError::AmountMismatch { .. }) = &result {
                state.metrics.amount_mismatches.inc();
            }
            Ok(Json(result?))
        }
        PaymentStatus::Failed => {
            let reason = req.reason.unwrap_or_else(|| "declined by provider".to_string());
            let booking = reconciler
                .fail_payment(
                    req.booking_id,
                    &req.method,
                    Some(req.provider_transaction_id),
                    req.amount,
                    &reason,
                )
                .await?;
            Ok(Json(booking))
        }
    }
}
