use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{BookingError, BusStatus, Clock, CoreResult, RouteAssignment, RouteStatus};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    /// Defaults to the bus capacity.
    #[serde(default)]
    pub assigned_seats: Option<u32>,
}

/// Puts approved buses on active routes.
pub struct AssignmentScheduler {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
}

impl AssignmentScheduler {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create_assignment(&self, request: NewAssignment) -> CoreResult<RouteAssignment> {
        let bus = self
            .store
            .get_bus(request.bus_id)
            .await?
            .ok_or_else(|| BookingError::not_found("bus", request.bus_id))?;
        if bus.status != BusStatus::Approved {
            return Err(BookingError::validation(
                "busId",
                format!("bus {} is {}, only APPROVED buses can be assigned", bus.id, bus.status.as_str()),
            ));
        }

        let route = self
            .store
            .get_route(request.route_id)
            .await?
            .ok_or_else(|| BookingError::not_found("route", request.route_id))?;
        if route.status != RouteStatus::Active {
            return Err(BookingError::validation(
                "routeId",
                format!("route {} is {}", route.id, route.status.as_str()),
            ));
        }

        let assigned_seats = request.assigned_seats.unwrap_or(bus.seating_capacity);
        if assigned_seats == 0 || assigned_seats > bus.seating_capacity {
            return Err(BookingError::validation(
                "assignedSeats",
                format!("must be between 1 and {}", bus.seating_capacity),
            ));
        }

        let assignment = RouteAssignment {
            id: Uuid::new_v4(),
            bus_id: bus.id,
            route_id: route.id,
            departure_date: request.departure_date,
            departure_time: request.departure_time,
            assigned_seats,
            created_at: self.clock.now(),
        };

        match self.store.create_assignment(assignment).await {
            Ok(created) => {
                tracing::info!(
                    "Bus {} assigned to route {} departing {}",
                    created.bus_id,
                    created.route_id,
                    created.departs_at()
                );
                Ok(created)
            }
            Err(BookingError::AssignmentOverlap { existing }) => {
                tracing::warn!("Bus {} already runs assignment {} in that window", bus.id, existing);
                Err(BookingError::AssignmentOverlap { existing })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;
    use chrono::Utc;
    use transit_core::{Bus, ManualClock};

    fn slot(bus_id: Uuid, route_id: Uuid, date: NaiveDate, hour: u32) -> NewAssignment {
        NewAssignment {
            bus_id,
            route_id,
            departure_date: date,
            departure_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            assigned_seats: None,
        }
    }

    #[tokio::test]
    async fn test_defaults_to_capacity_and_rejects_overlap() {
        let f = fixture().await;
        let scheduler = AssignmentScheduler::new(f.store.clone(), Arc::new(ManualClock::new(Utc::now())));
        let date = NaiveDate::from_ymd_opt(2026, 12, 2).unwrap();

        let created = scheduler.create_assignment(slot(f.bus_id, f.route_id, date, 8)).await.unwrap();
        assert_eq!(created.assigned_seats, 40);

        // 08:00-10:30 is taken; 09:00 overlaps, 10:30 does not
        let err = scheduler.create_assignment(slot(f.bus_id, f.route_id, date, 9)).await.unwrap_err();
        assert_eq!(err, BookingError::AssignmentOverlap { existing: created.id });

        let mut later = slot(f.bus_id, f.route_id, date, 10);
        later.departure_time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert!(scheduler.create_assignment(later).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_unapproved_bus_and_bad_seat_count() {
        let f = fixture().await;
        let scheduler = AssignmentScheduler::new(f.store.clone(), Arc::new(ManualClock::new(Utc::now())));
        let date = NaiveDate::from_ymd_opt(2026, 12, 3).unwrap();

        let pending = Bus {
            id: Uuid::new_v4(),
            registration_number: "WP-0001".to_string(),
            name: "Night Rider".to_string(),
            seating_capacity: 30,
            status: BusStatus::Pending,
            owner_id: None,
        };
        let pending_id = pending.id;
        f.store.insert_bus(pending).unwrap();

        let err = scheduler.create_assignment(slot(pending_id, f.route_id, date, 8)).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation { ref field, .. } if field == "busId"));

        let mut too_many = slot(f.bus_id, f.route_id, date, 8);
        too_many.assigned_seats = Some(41);
        let err = scheduler.create_assignment(too_many).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation { ref field, .. } if field == "assignedSeats"));

        let err = scheduler
            .create_assignment(slot(f.bus_id, Uuid::new_v4(), date, 8))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFound { entity: "route", .. }));
    }
}
