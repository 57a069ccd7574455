use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use transit_shared::models::events::SeatEvent;
use uuid::Uuid;

use crate::{
    AssignmentContext, Booking, BookingError, BookingStatus, Bus, CancellationReason, CoreResult, NewBooking,
    Payment, Route, RouteAssignment,
};

/// Outcome of a compare-and-set status change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The booking was in an allowed source state and has been moved.
    Applied(Booking),
    /// The booking was already elsewhere; returned as found.
    Unchanged(Booking),
    /// The hold had lapsed, so this call cancelled the booking as
    /// RESERVATION_EXPIRED instead of applying the requested change.
    Expired(Booking),
}

impl Transition {
    pub fn booking(&self) -> &Booking {
        match self {
            Transition::Applied(b) | Transition::Unchanged(b) | Transition::Expired(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            Transition::Applied(b) | Transition::Unchanged(b) | Transition::Expired(b) => b,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }

    /// Whether this call released seats, either as the requested change or
    /// by expiring the hold.
    pub fn released_seats(&self) -> bool {
        match self {
            Transition::Applied(b) => b.status == BookingStatus::Cancelled,
            Transition::Expired(_) => true,
            Transition::Unchanged(_) => false,
        }
    }
}

/// Result of `reserve`. Either way it carries the stale holds on the same
/// assignment that were expired while the lock was held; those stay
/// cancelled even when the reservation itself conflicts.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    Reserved { booking: Booking, expired: Vec<Booking> },
    Conflict { seats: Vec<u32>, expired: Vec<Booking> },
}

impl ReserveOutcome {
    pub fn expired(&self) -> &[Booking] {
        match self {
            ReserveOutcome::Reserved { expired, .. } | ReserveOutcome::Conflict { expired, .. } => expired,
        }
    }

    /// The new booking, or `SeatConflict` naming the taken seats.
    pub fn into_booking(self) -> CoreResult<Booking> {
        match self {
            ReserveOutcome::Reserved { booking, .. } => Ok(booking),
            ReserveOutcome::Conflict { seats, .. } => Err(BookingError::SeatConflict { seats }),
        }
    }
}

/// One confirmed booking's contribution to a bus's income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueEntry {
    pub departure_date: NaiveDate,
    pub total_price: i64,
}

/// The booking/seat-occupancy store: the only shared mutable resource.
///
/// Implementations must make `reserve` and every status change atomic with
/// respect to other calls touching the same route assignment. Connectivity
/// problems surface as `BookingError::SourceUnavailable`, never as empty
/// results.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get_bus(&self, bus_id: Uuid) -> CoreResult<Option<Bus>>;

    async fn get_route(&self, route_id: Uuid) -> CoreResult<Option<Route>>;

    async fn assignment_context(&self, assignment_id: Uuid) -> CoreResult<Option<AssignmentContext>>;

    /// Earliest departure of `bus_id` on `route_id` on `date`.
    async fn find_assignment(
        &self,
        bus_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Option<AssignmentContext>>;

    /// Inserts the assignment unless the bus already has one whose journey
    /// window overlaps; serialised per bus.
    async fn create_assignment(&self, assignment: RouteAssignment) -> CoreResult<RouteAssignment>;

    /// Seats held by confirmed bookings and unexpired pending bookings.
    async fn occupied_seats(&self, assignment_id: Uuid, now: DateTime<Utc>) -> CoreResult<BTreeSet<u32>>;

    /// Atomically re-checks occupancy and inserts a PENDING_PAYMENT booking.
    /// Stale holds on the assignment are expired first (as of
    /// `booking.created_at`) and reported in the outcome. When a requested
    /// seat is taken the outcome is `Conflict` naming every taken seat and
    /// nothing is inserted.
    async fn reserve(&self, booking: NewBooking) -> CoreResult<ReserveOutcome>;

    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>>;

    /// PENDING_PAYMENT -> CONFIRMED, recording `payment`. A pending booking
    /// whose hold ended at or before `now` is cancelled instead and returned
    /// as `Expired`.
    async fn confirm_booking(
        &self,
        booking_id: Uuid,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition>;

    /// Moves the booking to CANCELLED if its current status is in `from`,
    /// recording `payment` when given.
    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        reason: CancellationReason,
        payment: Option<&Payment>,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition>;

    /// Cancels every PENDING_PAYMENT booking whose hold ended at or before
    /// `now`; returns the cancelled bookings.
    async fn expire_stale_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Booking>>;

    async fn bookings_for_bus(&self, bus_id: Uuid) -> CoreResult<Vec<Booking>>;

    async fn bookings_for_passenger(&self, email: &str) -> CoreResult<Vec<Booking>>;

    /// CONFIRMED bookings of `bus_id` departing in `[from, until)`.
    async fn confirmed_revenue(
        &self,
        bus_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> CoreResult<Vec<RevenueEntry>>;

    async fn payments_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Payment>>;
}

/// Fan-out for seat events (event bus, live streams).
#[async_trait]
pub trait SeatEventPublisher: Send + Sync {
    async fn publish(&self, event: &SeatEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
