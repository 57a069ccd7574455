pub mod booking;
pub mod clock;
pub mod fleet;
pub mod payment;
pub mod repository;
pub mod seat_map;

use uuid::Uuid;

pub use booking::{Booking, BookingStatus, CancellationReason, NewBooking, PassengerDetails};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fleet::{journey_duration, AssignmentContext, Bus, BusStatus, Route, RouteAssignment, RouteStatus};
pub use payment::{Payment, PaymentResult, PaymentStatus};
pub use seat_map::{generate_seat_map, Seat, SeatKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid seating capacity: {0}")]
    InvalidCapacity(i64),

    #[error("Seats already taken: {seats:?}")]
    SeatConflict { seats: Vec<u32> },

    #[error("Payment amount {received} does not match booking total {expected}")]
    AmountMismatch { expected: i64, received: i64 },

    #[error("Booking store unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Booking {booking_id} expired, seats {seats:?} were released")]
    BookingExpired { booking_id: Uuid, seats: Vec<u32> },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Bus is already assigned to an overlapping slot (assignment {existing})")]
    AssignmentOverlap { existing: Uuid },
}

impl BookingError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        BookingError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Conflicts the caller can resolve by refreshing occupancy and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::SeatConflict { .. } | BookingError::SourceUnavailable(_)
        )
    }
}

pub type CoreResult<T> = Result<T, BookingError>;
