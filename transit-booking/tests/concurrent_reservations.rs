use chrono::{NaiveDate, NaiveTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use transit_booking::{
    BookingRules, BookingServices, EventFanout, InMemoryBookingStore, ReserveRequest,
};
use transit_core::repository::BookingStore;
use transit_core::{
    BookingError, BookingStatus, Bus, BusStatus, PassengerDetails, PaymentResult, Route,
    RouteAssignment, RouteStatus, SystemClock,
};
use transit_shared::Masked;
use uuid::Uuid;

async fn services() -> (BookingServices, Arc<InMemoryBookingStore>, Uuid) {
    let store = Arc::new(InMemoryBookingStore::new());
    let bus_id = Uuid::new_v4();
    let route_id = Uuid::new_v4();

    store
        .insert_bus(Bus {
            id: bus_id,
            registration_number: "SP-4455".to_string(),
            name: "Southern Line".to_string(),
            seating_capacity: 40,
            status: BusStatus::Approved,
            owner_id: None,
        })
        .unwrap();
    store
        .insert_route(Route {
            id: route_id,
            origin: "Kandy".to_string(),
            destination: "Jaffna".to_string(),
            departure_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            ticket_price: 2500,
            status: RouteStatus::Active,
        })
        .unwrap();
    let assignment = store
        .create_assignment(RouteAssignment {
            id: Uuid::new_v4(),
            bus_id,
            route_id,
            departure_date: NaiveDate::from_ymd_opt(2026, 12, 24).unwrap(),
            departure_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            assigned_seats: 40,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let services = BookingServices::new(
        store.clone(),
        Arc::new(SystemClock),
        EventFanout::new(),
        BookingRules::default(),
    );
    (services, store, assignment.id)
}

fn request(assignment_id: Uuid, seats: Vec<i64>, n: usize) -> ReserveRequest {
    ReserveRequest {
        assignment_id,
        seat_numbers: seats,
        passenger: PassengerDetails {
            name: format!("Passenger {}", n),
            email: Masked(format!("p{}@example.com", n)),
            phone: Masked("0770000000".to_string()),
            nic: None,
        },
        client_total: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn two_passengers_racing_for_seat_12_only_one_wins() {
    let (services, _, assignment_id) = services().await;

    let a = {
        let s = services.clone();
        tokio::spawn(async move { s.reservations.reserve_seats(request(assignment_id, vec![12], 1)).await })
    };
    let b = {
        let s = services.clone();
        tokio::spawn(async move { s.reservations.reserve_seats(request(assignment_id, vec![12], 2)).await })
    };

    let results = vec![a.await.unwrap(), b.await.unwrap()];
    let won = results.iter().filter(|r| r.is_ok()).count();
    let conflicts: Vec<_> = results.into_iter().filter_map(|r| r.err()).collect();

    assert_eq!(won, 1);
    assert_eq!(conflicts, vec![BookingError::SeatConflict { seats: vec![12] }]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_overlapping_requests_never_double_book() {
    let (services, store, assignment_id) = services().await;

    let mut handles = Vec::new();
    for n in 0..200usize {
        let s = services.clone();
        // overlapping pairs across the first 20 seats
        let first = (n % 20) as i64 + 1;
        let second = ((n + 7) % 20) as i64 + 1;
        handles.push(tokio::spawn(async move {
            s.reservations.reserve_seats(request(assignment_id, vec![first, second], n)).await
        }));
    }

    let mut held = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(booking) => held.extend(booking.seats),
            Err(BookingError::SeatConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let unique: HashSet<u32> = held.iter().copied().collect();
    assert_eq!(unique.len(), held.len(), "a seat was sold twice: {:?}", held);

    let occupied = store.occupied_seats(assignment_id, Utc::now()).await.unwrap();
    assert_eq!(occupied.len(), held.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_payment_callbacks_confirm_once() {
    let (services, store, assignment_id) = services().await;
    let booking = services
        .reservations
        .reserve_seats(request(assignment_id, vec![3, 4], 1))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for attempt in 0..10 {
        let s = services.clone();
        handles.push(tokio::spawn(async move {
            s.payments
                .confirm_payment(
                    booking.id,
                    PaymentResult {
                        method: "CARD".to_string(),
                        provider_transaction_id: format!("retry-{}", attempt),
                        amount: 5000,
                    },
                )
                .await
        }));
    }

    for handle in handles {
        let confirmed = handle.await.unwrap().unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
    }

    assert_eq!(store.payments_for_booking(booking.id).await.unwrap().len(), 1);
}
