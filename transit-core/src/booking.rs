use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use transit_shared::Masked;
use uuid::Uuid;

use crate::{BookingError, CoreResult};

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "PENDING_PAYMENT",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(BookingStatus::PendingPayment),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::validation("bookingStatus", format!("unknown status {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationReason {
    PaymentFailed,
    CustomerCancelled,
    ReservationExpired,
}

impl CancellationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancellationReason::PaymentFailed => "PAYMENT_FAILED",
            CancellationReason::CustomerCancelled => "CUSTOMER_CANCELLED",
            CancellationReason::ReservationExpired => "RESERVATION_EXPIRED",
        }
    }
}

impl FromStr for CancellationReason {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYMENT_FAILED" => Ok(CancellationReason::PaymentFailed),
            "CUSTOMER_CANCELLED" => Ok(CancellationReason::CustomerCancelled),
            "RESERVATION_EXPIRED" => Ok(CancellationReason::ReservationExpired),
            other => Err(BookingError::validation("cancellationReason", format!("unknown reason {}", other))),
        }
    }
}

/// Contact details of the travelling passenger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassengerDetails {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    #[serde(default)]
    pub nic: Option<Masked<String>>,
}

impl PassengerDetails {
    /// Trims every field and drops an empty NIC.
    pub fn normalized(self) -> Self {
        let nic = self
            .nic
            .map(|n| n.into_inner().trim().to_string())
            .filter(|n| !n.is_empty())
            .map(Masked);

        Self {
            name: self.name.trim().to_string(),
            email: Masked(self.email.into_inner().trim().to_string()),
            phone: Masked(self.phone.into_inner().trim().to_string()),
            nic,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(BookingError::validation("passenger.name", "must not be empty"));
        }
        let email = self.email.expose().trim();
        if email.is_empty() {
            return Err(BookingError::validation("passenger.email", "must not be empty"));
        }
        if !email.contains('@') {
            return Err(BookingError::validation("passenger.email", "is not an email address"));
        }
        if self.phone.expose().trim().is_empty() {
            return Err(BookingError::validation("passenger.phone", "must not be empty"));
        }
        Ok(())
    }
}

/// A passenger's hold on (and, once paid, ownership of) a set of seats on
/// one route assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub departure_date: NaiveDate,
    pub passenger: PassengerDetails,
    /// Ascending, no duplicates.
    pub seats: Vec<u32>,
    pub total_price: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub cancellation_reason: Option<CancellationReason>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn from_new(new: NewBooking, context: &crate::AssignmentContext) -> Self {
        Self {
            id: new.id,
            assignment_id: new.assignment_id,
            bus_id: context.assignment.bus_id,
            route_id: context.assignment.route_id,
            departure_date: context.assignment.departure_date,
            passenger: new.passenger,
            seats: new.seats,
            total_price: new.total_price,
            currency: new.currency,
            status: BookingStatus::PendingPayment,
            cancellation_reason: None,
            payment_method: None,
            transaction_id: None,
            created_at: new.created_at,
            expires_at: new.expires_at,
            updated_at: new.created_at,
        }
    }

    /// Whether this booking occupies its seats at `now`.
    pub fn holds_seats_at(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            BookingStatus::Confirmed => true,
            BookingStatus::PendingPayment => self.expires_at > now,
            BookingStatus::Cancelled => false,
        }
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::PendingPayment && self.expires_at <= now
    }

    pub fn cancel(&mut self, reason: CancellationReason, now: DateTime<Utc>) {
        self.status = BookingStatus::Cancelled;
        self.cancellation_reason = Some(reason);
        self.updated_at = now;
    }
}

/// A validated, priced reservation request ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub passenger: PassengerDetails,
    pub seats: Vec<u32>,
    pub total_price: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn passenger(name: &str, email: &str, phone: &str) -> PassengerDetails {
        PassengerDetails {
            name: name.to_string(),
            email: Masked(email.to_string()),
            phone: Masked(phone.to_string()),
            nic: Some(Masked("   ".to_string())),
        }
    }

    #[test]
    fn test_passenger_validation() {
        assert!(passenger("Nimal", "nimal@example.com", "0771234567").validate().is_ok());

        let err = passenger("  ", "nimal@example.com", "0771234567").validate().unwrap_err();
        assert_eq!(err, BookingError::validation("passenger.name", "must not be empty"));

        let err = passenger("Nimal", "nimal.example.com", "0771234567").validate().unwrap_err();
        assert!(matches!(err, BookingError::Validation { ref field, .. } if field == "passenger.email"));

        let err = passenger("Nimal", "nimal@example.com", "").validate().unwrap_err();
        assert!(matches!(err, BookingError::Validation { ref field, .. } if field == "passenger.phone"));
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_nic() {
        let p = passenger(" Nimal ", " nimal@example.com", "077 ").normalized();
        assert_eq!(p.name, "Nimal");
        assert_eq!(p.email.expose(), "nimal@example.com");
        assert_eq!(p.phone.expose(), "077");
        assert!(p.nic.is_none());
    }

    #[test]
    fn test_hold_expiry() {
        let now = Utc::now();
        let mut booking = Booking {
            id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            bus_id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            departure_date: now.date_naive(),
            passenger: passenger("Nimal", "nimal@example.com", "077"),
            seats: vec![1, 2],
            total_price: 3000,
            currency: "LKR".to_string(),
            status: BookingStatus::PendingPayment,
            cancellation_reason: None,
            payment_method: None,
            transaction_id: None,
            created_at: now,
            expires_at: now + Duration::minutes(15),
            updated_at: now,
        };

        assert!(booking.holds_seats_at(now));
        assert!(!booking.holds_seats_at(now + Duration::minutes(15)));
        assert!(booking.is_hold_expired(now + Duration::minutes(16)));

        booking.status = BookingStatus::Confirmed;
        assert!(booking.holds_seats_at(now + Duration::days(1)));
        assert!(!booking.is_hold_expired(now + Duration::days(1)));

        booking.cancel(CancellationReason::CustomerCancelled, now);
        assert!(!booking.holds_seats_at(now));
        assert_eq!(booking.cancellation_reason, Some(CancellationReason::CustomerCancelled));
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [BookingStatus::PendingPayment, BookingStatus::Confirmed, BookingStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!(BookingStatus::Confirmed.is_terminal());
        assert!(!BookingStatus::PendingPayment.is_terminal());
    }
}
