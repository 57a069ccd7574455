use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{Bus, BusStatus, PassengerDetails, Route, RouteAssignment, RouteStatus};
use transit_shared::Masked;
use uuid::Uuid;

use crate::memory::InMemoryBookingStore;

pub struct Fixture {
    pub store: Arc<InMemoryBookingStore>,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub assignment_id: Uuid,
    pub departure_date: NaiveDate,
}

/// 40-seat approved bus on an active Colombo-Galle route (08:00-10:30,
/// 1200 per seat) with one assignment on 2026-12-01.
pub async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryBookingStore::new());
    let bus_id = Uuid::new_v4();
    let route_id = Uuid::new_v4();
    let departure_date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();

    store
        .insert_bus(Bus {
            id: bus_id,
            registration_number: "NB-1234".to_string(),
            name: "Highway Express".to_string(),
            seating_capacity: 40,
            status: BusStatus::Approved,
            owner_id: None,
        })
        .unwrap();
    store
        .insert_route(Route {
            id: route_id,
            origin: "Colombo".to_string(),
            destination: "Galle".to_string(),
            departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            ticket_price: 1200,
            status: RouteStatus::Active,
        })
        .unwrap();

    let assignment = store
        .create_assignment(RouteAssignment {
            id: Uuid::new_v4(),
            bus_id,
            route_id,
            departure_date,
            departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            assigned_seats: 40,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    Fixture {
        store,
        bus_id,
        route_id,
        assignment_id: assignment.id,
        departure_date,
    }
}

pub async fn seeded_store() -> (Arc<InMemoryBookingStore>, Uuid) {
    let f = fixture().await;
    (f.store, f.assignment_id)
}

pub fn passenger() -> PassengerDetails {
    PassengerDetails {
        name: "Amaya Perera".to_string(),
        email: Masked("amaya@example.com".to_string()),
        phone: Masked("0711234567".to_string()),
        nic: None,
    }
}
