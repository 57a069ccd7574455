use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic names used when seat events leave the process.
pub mod topics {
    pub const SEATS_RESERVED: &str = "seats.reserved";
    pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
    pub const SEATS_RELEASED: &str = "seats.released";
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatEventKind {
    SeatsReserved,
    BookingConfirmed,
    SeatsReleased,
}

impl SeatEventKind {
    pub fn topic(&self) -> &'static str {
        match self {
            SeatEventKind::SeatsReserved => topics::SEATS_RESERVED,
            SeatEventKind::BookingConfirmed => topics::BOOKING_CONFIRMED,
            SeatEventKind::SeatsReleased => topics::SEATS_RELEASED,
        }
    }

    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            SeatEventKind::SeatsReserved => "seats_reserved",
            SeatEventKind::BookingConfirmed => "booking_confirmed",
            SeatEventKind::SeatsReleased => "seats_released",
        }
    }
}

/// Emitted whenever the occupancy of a route assignment changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub kind: SeatEventKind,
    pub assignment_id: Uuid,
    pub booking_id: Uuid,
    pub seats: Vec<u32>,
    pub reason: Option<String>,
    pub timestamp: i64,
}
