use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::BookingError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(BookingError::validation("paymentStatus", format!("unknown status {}", other))),
        }
    }
}

/// What the payment provider reported for a successful charge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub method: String,
    pub provider_transaction_id: String,
    pub amount: i64,
}

/// Record of one provider callback against a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub method: String,
    pub provider_transaction_id: Option<String>,
    pub amount: i64,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn completed(booking_id: Uuid, result: &PaymentResult, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            method: result.method.clone(),
            provider_transaction_id: Some(result.provider_transaction_id.clone()),
            amount: result.amount,
            status: PaymentStatus::Completed,
            failure_reason: None,
            created_at: now,
        }
    }

    pub fn failed(
        booking_id: Uuid,
        method: &str,
        provider_transaction_id: Option<String>,
        amount: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            method: method.to_string(),
            provider_transaction_id,
            amount,
            status: PaymentStatus::Failed,
            failure_reason: Some(reason.to_string()),
            created_at: now,
        }
    }
}
