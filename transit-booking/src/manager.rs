use std::collections::BTreeSet;
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{
    Booking, BookingError, BookingStatus, CancellationReason, Clock, CoreResult, NewBooking,
    PassengerDetails,
};
use transit_shared::models::events::SeatEventKind;
use uuid::Uuid;

use crate::publisher::EventFanout;
use crate::BookingRules;

/// A passenger's seat selection as submitted.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub assignment_id: Uuid,
    /// Raw numbers from the client; range-checked here.
    pub seat_numbers: Vec<i64>,
    pub passenger: PassengerDetails,
    /// Total the client displayed. Informational only.
    pub client_total: Option<i64>,
}

/// Manages the booking lifecycle up to payment: reservation, customer
/// cancellation and booking reads.
pub struct ReservationManager {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    events: EventFanout,
    rules: BookingRules,
}

impl ReservationManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        events: EventFanout,
        rules: BookingRules,
    ) -> Self {
        Self { store, clock, events, rules }
    }

    /// Creates a PENDING_PAYMENT booking holding `seat_numbers`, or fails
    /// without holding anything.
    pub async fn reserve_seats(&self, request: ReserveRequest) -> CoreResult<Booking> {
        let passenger = request.passenger.normalized();
        passenger.validate()?;

        let context = self
            .store
            .assignment_context(request.assignment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("route assignment", request.assignment_id))?;

        let seats = validate_seats(&request.seat_numbers, context.seat_limit())?;
        let total_price = context.ticket_price * seats.len() as i64;

        if let Some(client_total) = request.client_total {
            if client_total != total_price {
                tracing::warn!(
                    "Ignoring client total {} for assignment {}; server total is {}",
                    client_total,
                    request.assignment_id,
                    total_price
                );
            }
        }

        let now = self.clock.now();
        let new_booking = NewBooking {
            id: Uuid::new_v4(),
            assignment_id: request.assignment_id,
            passenger,
            seats,
            total_price,
            currency: self.rules.currency.clone(),
            created_at: now,
            expires_at: now + self.rules.hold,
        };

        let outcome = self.store.reserve(new_booking).await?;

        for released in outcome.expired() {
            tracing::info!("Hold {} expired, seats {:?} released", released.id, released.seats);
            self.events.booking_event(SeatEventKind::SeatsReleased, released).await;
        }

        let booking = match outcome.into_booking() {
            Ok(booking) => booking,
            Err(BookingError::SeatConflict { seats }) => {
                tracing::warn!(
                    "Seat conflict on assignment {}: {:?} already taken",
                    request.assignment_id,
                    seats
                );
                return Err(BookingError::SeatConflict { seats });
            }
            Err(e) => return Err(e),
        };
        tracing::info!(
            "Booking {} holds seats {:?} on assignment {} until {}",
            booking.id,
            booking.seats,
            booking.assignment_id,
            booking.expires_at
        );
        self.events.booking_event(SeatEventKind::SeatsReserved, &booking).await;

        Ok(booking)
    }

    /// Customer cancellation. Pending and confirmed bookings release their
    /// seats; an already cancelled booking is returned as is.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        let transition = self
            .store
            .cancel_booking(
                booking_id,
                &[BookingStatus::PendingPayment, BookingStatus::Confirmed],
                CancellationReason::CustomerCancelled,
                None,
                self.clock.now(),
            )
            .await?;

        if transition.is_applied() {
            let booking = transition.booking();
            tracing::info!("Booking {} cancelled by customer, seats {:?} released", booking.id, booking.seats);
            self.events.booking_event(SeatEventKind::SeatsReleased, booking).await;
        }

        Ok(transition.into_booking())
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }

    pub async fn bookings_for_bus(&self, bus_id: Uuid) -> CoreResult<Vec<Booking>> {
        if self.store.get_bus(bus_id).await?.is_none() {
            return Err(BookingError::not_found("bus", bus_id));
        }
        self.store.bookings_for_bus(bus_id).await
    }

    pub async fn bookings_for_passenger(&self, email: &str) -> CoreResult<Vec<Booking>> {
        let email = email.trim();
        if email.is_empty() {
            return Err(BookingError::validation("email", "must not be empty"));
        }
        self.store.bookings_for_passenger(email).await
    }
}

/// Checks the requested seats and returns them ascending.
fn validate_seats(requested: &[i64], seat_limit: u32) -> CoreResult<Vec<u32>> {
    if requested.is_empty() {
        return Err(BookingError::validation("seatNumbers", "at least one seat is required"));
    }

    let mut seats = BTreeSet::new();
    for &number in requested {
        if number < 1 || number > seat_limit as i64 {
            return Err(BookingError::validation(
                "seatNumbers",
                format!("seat {} is outside 1..={}", number, seat_limit),
            ));
        }
        if !seats.insert(number as u32) {
            return Err(BookingError::validation(
                "seatNumbers",
                format!("seat {} is requested more than once", number),
            ));
        }
    }

    Ok(seats.into_iter().collect())
}
