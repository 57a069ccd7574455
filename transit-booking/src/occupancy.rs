use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{generate_seat_map, AssignmentContext, BookingError, Clock, CoreResult, Seat};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    Available,
    Occupied,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    #[serde(flatten)]
    pub seat: Seat,
    pub state: SeatState,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatStatusSummary {
    pub total: u32,
    pub occupied: u32,
    pub available: u32,
}

/// Read side of seat inventory. Never substitutes an empty or sample set
/// when the store fails; the error is handed back to the caller.
pub struct OccupancyResolver {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
}

impl OccupancyResolver {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Occupied seats of the earliest assignment of `bus_id` on `route_id`
    /// departing on `date`.
    pub async fn occupied_seats(
        &self,
        bus_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<BTreeSet<u32>> {
        let context = self
            .store
            .find_assignment(bus_id, route_id, date)
            .await?
            .ok_or_else(|| {
                BookingError::not_found("route assignment", format!("bus {} route {} on {}", bus_id, route_id, date))
            })?;

        self.store.occupied_seats(context.assignment.id, self.clock.now()).await
    }

    pub async fn occupied_for_assignment(&self, assignment_id: Uuid) -> CoreResult<BTreeSet<u32>> {
        self.context(assignment_id).await?;
        self.store.occupied_seats(assignment_id, self.clock.now()).await
    }

    /// Seat map of the assignment annotated with current occupancy.
    pub async fn seat_view(&self, assignment_id: Uuid) -> CoreResult<Vec<SeatView>> {
        let context = self.context(assignment_id).await?;
        let occupied = self.store.occupied_seats(assignment_id, self.clock.now()).await?;

        let seats = generate_seat_map(context.seat_limit() as i32)?;
        Ok(seats
            .into_iter()
            .map(|seat| {
                let state = if occupied.contains(&seat.number) {
                    SeatState::Occupied
                } else {
                    SeatState::Available
                };
                SeatView { seat, state }
            })
            .collect())
    }

    pub async fn seat_status(&self, assignment_id: Uuid) -> CoreResult<SeatStatusSummary> {
        let context = self.context(assignment_id).await?;
        let occupied = self.store.occupied_seats(assignment_id, self.clock.now()).await?;

        let total = context.seat_limit();
        let occupied = occupied.iter().filter(|&&n| n <= total).count() as u32;
        Ok(SeatStatusSummary {
            total,
            occupied,
            available: total - occupied,
        })
    }

    async fn context(&self, assignment_id: Uuid) -> CoreResult<AssignmentContext> {
        self.store
            .assignment_context(assignment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("route assignment", assignment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, passenger};
    use crate::{BookingRules, EventFanout, ReservationManager, ReserveRequest};
    use chrono::Utc;
    use transit_core::ManualClock;

    #[tokio::test]
    async fn test_reserved_seats_show_as_occupied() {
        let f = fixture().await;
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let resolver = OccupancyResolver::new(f.store.clone(), clock.clone());
        let manager = ReservationManager::new(f.store.clone(), clock, EventFanout::new(), BookingRules::default());

        manager
            .reserve_seats(ReserveRequest {
                assignment_id: f.assignment_id,
                seat_numbers: vec![4, 1],
                passenger: passenger(),
                client_total: None,
            })
            .await
            .unwrap();

        let by_slot = resolver.occupied_seats(f.bus_id, f.route_id, f.departure_date).await.unwrap();
        assert_eq!(by_slot.into_iter().collect::<Vec<_>>(), vec![1, 4]);

        let view = resolver.seat_view(f.assignment_id).await.unwrap();
        assert_eq!(view.len(), 40);
        assert_eq!(view[0].state, SeatState::Occupied);
        assert_eq!(view[1].state, SeatState::Available);
        assert_eq!(view[3].state, SeatState::Occupied);

        let summary = resolver.seat_status(f.assignment_id).await.unwrap();
        assert_eq!(summary, SeatStatusSummary { total: 40, occupied: 2, available: 38 });
    }

    #[tokio::test]
    async fn test_missing_assignment_and_unreachable_store() {
        let f = fixture().await;
        let resolver = OccupancyResolver::new(f.store.clone(), Arc::new(ManualClock::new(Utc::now())));

        let other_day = f.departure_date.succ_opt().unwrap();
        let err = resolver.occupied_seats(f.bus_id, f.route_id, other_day).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound { .. }));

        f.store.set_offline(true);
        let err = resolver.occupied_for_assignment(f.assignment_id).await.unwrap_err();
        assert!(matches!(err, BookingError::SourceUnavailable(_)));
    }

    #[test]
    fn test_seat_view_serializes_flat() {
        let view = SeatView {
            seat: Seat::new(1),
            state: SeatState::Occupied,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["number"], 1);
        assert_eq!(value["state"], "OCCUPIED");
    }
}
