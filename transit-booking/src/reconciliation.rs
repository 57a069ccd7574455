use std::sync::Arc;
use transit_core::repository::{BookingStore, Transition};
use transit_core::{
    Booking, BookingError, BookingStatus, CancellationReason, Clock, CoreResult, Payment,
    PaymentResult,
};
use transit_shared::models::events::SeatEventKind;
use uuid::Uuid;

use crate::publisher::EventFanout;

/// Applies payment-provider callbacks to bookings. The only path that may
/// make a booking CONFIRMED.
pub struct PaymentReconciler {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    events: EventFanout,
}

impl PaymentReconciler {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, events: EventFanout) -> Self {
        Self { store, clock, events }
    }

    /// PENDING_PAYMENT -> CONFIRMED.
    ///
    /// Terminal bookings are returned unchanged, so provider retries are
    /// harmless. A hold past its deadline is released and reported as
    /// `BookingExpired`. An amount different from the server total is
    /// refused and the booking keeps waiting for a correct payment.
    pub async fn confirm_payment(&self, booking_id: Uuid, result: PaymentResult) -> CoreResult<Booking> {
        let booking = self.load(booking_id).await?;
        let now = self.clock.now();

        if booking.status.is_terminal() {
            tracing::debug!("Booking {} already {}, ignoring payment callback", booking.id, booking.status.as_str());
            return Ok(booking);
        }

        if booking.is_hold_expired(now) {
            let transition = self
                .store
                .cancel_booking(
                    booking_id,
                    &[BookingStatus::PendingPayment],
                    CancellationReason::ReservationExpired,
                    None,
                    now,
                )
                .await?;
            return self.expired_or_current(transition).await;
        }

        if result.amount != booking.total_price {
            tracing::warn!(
                "FRAUD SIGNAL: payment {} for booking {} carries amount {}, expected {}",
                result.provider_transaction_id,
                booking.id,
                result.amount,
                booking.total_price
            );
            return Err(BookingError::AmountMismatch {
                expected: booking.total_price,
                received: result.amount,
            });
        }

        let payment = Payment::completed(booking_id, &result, now);
        match self.store.confirm_booking(booking_id, &payment, now).await? {
            Transition::Applied(confirmed) => {
                tracing::info!(
                    "Booking {} confirmed by {} payment {}, seats {:?}",
                    confirmed.id,
                    payment.method,
                    result.provider_transaction_id,
                    confirmed.seats
                );
                self.events.booking_event(SeatEventKind::BookingConfirmed, &confirmed).await;
                Ok(confirmed)
            }
            unchanged => self.expired_or_current(unchanged).await,
        }
    }

    /// PENDING_PAYMENT -> CANCELLED(PAYMENT_FAILED), releasing the seats and
    /// recording the failed attempt. Terminal bookings are left alone.
    pub async fn fail_payment(
        &self,
        booking_id: Uuid,
        method: &str,
        provider_transaction_id: Option<String>,
        amount: i64,
        reason: &str,
    ) -> CoreResult<Booking> {
        let booking = self.load(booking_id).await?;
        if booking.status.is_terminal() {
            return Ok(booking);
        }

        let now = self.clock.now();
        let payment = Payment::failed(booking_id, method, provider_transaction_id, amount, reason, now);
        let transition = self
            .store
            .cancel_booking(
                booking_id,
                &[BookingStatus::PendingPayment],
                CancellationReason::PaymentFailed,
                Some(&payment),
                now,
            )
            .await?;

        if transition.is_applied() {
            let cancelled = transition.booking();
            tracing::info!(
                "Payment failed for booking {} ({}), seats {:?} released",
                cancelled.id,
                reason,
                cancelled.seats
            );
            self.events.booking_event(SeatEventKind::SeatsReleased, cancelled).await;
        }

        Ok(transition.into_booking())
    }

    pub async fn payments_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Payment>> {
        self.load(booking_id).await?;
        self.store.payments_for_booking(booking_id).await
    }

    async fn load(&self, booking_id: Uuid) -> CoreResult<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }

    /// Result of a confirm that lost to a concurrent change or a deadline.
    async fn expired_or_current(&self, transition: Transition) -> CoreResult<Booking> {
        let released = transition.released_seats();
        let booking = transition.into_booking();

        if booking.cancellation_reason == Some(CancellationReason::ReservationExpired)
            && booking.status == BookingStatus::Cancelled
        {
            if released {
                tracing::info!("Hold {} expired before payment, seats {:?} released", booking.id, booking.seats);
                self.events.booking_event(SeatEventKind::SeatsReleased, &booking).await;
            }
            return Err(BookingError::BookingExpired {
                booking_id: booking.id,
                seats: booking.seats,
            });
        }

        Ok(booking)
    }
}
