use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{Booking, Clock, CoreResult};
use transit_shared::models::events::SeatEventKind;

use crate::publisher::EventFanout;

/// Cancels PENDING_PAYMENT bookings whose hold deadline has passed.
pub struct ExpirySweeper {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    events: EventFanout,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, events: EventFanout) -> Self {
        Self { store, clock, events }
    }

    pub async fn sweep_once(&self) -> CoreResult<Vec<Booking>> {
        let expired = self.store.expire_stale_holds(self.clock.now()).await?;

        for booking in &expired {
            tracing::info!(
                "Hold {} on assignment {} expired, seats {:?} released",
                booking.id,
                booking.assignment_id,
                booking.seats
            );
            self.events.booking_event(SeatEventKind::SeatsReleased, booking).await;
        }

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::BroadcastPublisher;
    use crate::testing::{passenger, seeded_store};
    use crate::{BookingRules, ReservationManager, ReserveRequest};
    use chrono::Utc;
    use tokio::sync::broadcast;
    use transit_core::{BookingStatus, CancellationReason, ManualClock};

    #[tokio::test]
    async fn test_sweep_cancels_only_stale_holds() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (store, assignment_id) = seeded_store().await;
        let (tx, mut rx) = broadcast::channel(16);
        let events = EventFanout::new().with_sink(Arc::new(BroadcastPublisher::new(tx)));

        let manager = ReservationManager::new(store.clone(), clock.clone(), events.clone(), BookingRules::default());
        let sweeper = ExpirySweeper::new(store.clone(), clock.clone(), events);

        let reserve = |seats: Vec<i64>| ReserveRequest {
            assignment_id,
            seat_numbers: seats,
            passenger: passenger(),
            client_total: None,
        };

        let stale = manager.reserve_seats(reserve(vec![1, 2])).await.unwrap();
        clock.advance(chrono::Duration::minutes(10));
        let fresh = manager.reserve_seats(reserve(vec![3])).await.unwrap();
        clock.advance(chrono::Duration::minutes(6));

        let expired = sweeper.sweep_once().await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, stale.id);
        assert_eq!(expired[0].cancellation_reason, Some(CancellationReason::ReservationExpired));

        let fresh = manager.get_booking(fresh.id).await.unwrap();
        assert_eq!(fresh.status, BookingStatus::PendingPayment);

        let occupied = store.occupied_seats(assignment_id, clock.now()).await.unwrap();
        assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec![3]);

        // two reservations then one release
        let kinds: Vec<_> = (0..3).map(|_| rx.try_recv().unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![SeatEventKind::SeatsReserved, SeatEventKind::SeatsReserved, SeatEventKind::SeatsReleased]
        );

        assert!(sweeper.sweep_once().await.unwrap().is_empty());
    }
}
