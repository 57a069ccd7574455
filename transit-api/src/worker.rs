use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use crate::state::AppState;

/// Releases stale holds every `interval` until `shutdown` flips to true.
/// Store failures are logged and retried on the next tick.
pub async fn start_expiry_worker(state: AppState, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Expiry worker started, sweeping every {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.services.sweeper.sweep_once().await {
                    Ok(expired) if !expired.is_empty() => {
                        info!("Expiry sweep released {} holds", expired.len());
                    }
                    Ok(_) => {}
                    Err(e) => error!("Expiry sweep failed: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Expiry worker stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AuthConfig;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use std::sync::Arc;
    use transit_booking::{EventFanout, InMemoryBookingStore, NewAssignment, ReserveRequest};
    use transit_core::{Bus, BusStatus, BookingStatus, ManualClock, PassengerDetails, Route, RouteStatus};
    use transit_shared::Masked;
    use transit_store::app_config::BusinessRules;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_worker_expires_holds_and_stops() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(InMemoryBookingStore::new());
        let bus_id = Uuid::new_v4();
        let route_id = Uuid::new_v4();
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

        let state = AppState::new(
            store.clone(),
            clock.clone(),
            EventFanout::new(),
            AuthConfig { secret: "secret".into() },
            BusinessRules::default(),
        )
        .unwrap();

        let assignment = state
            .services
            .scheduler
            .create_assignment(NewAssignment {
                bus_id,
                route_id,
                departure_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
                departure_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                assigned_seats: None,
            })
            .await
            .unwrap();

        let booking = state
            .services
            .reservations
            .reserve_seats(ReserveRequest {
                assignment_id: assignment.id,
                seat_numbers: vec![4],
                passenger: PassengerDetails {
                    name: "Amaya Perera".to_string(),
                    email: Masked("amaya@example.com".to_string()),
                    phone: Masked("0711234567".to_string()),
                    nic: None,
                },
                client_total: None,
            })
            .await
            .unwrap();
        clock.advance(chrono::Duration::hours(1));

        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(start_expiry_worker(state.clone(), Duration::from_millis(10), rx));

        for _ in 0..100 {
            if state.metrics.expired_holds.get() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.metrics.expired_holds.get(), 1);

        let booking = state.services.reservations.get_booking(booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
