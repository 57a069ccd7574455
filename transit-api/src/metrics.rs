use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};
use transit_core::repository::SeatEventPublisher;
use transit_core::CancellationReason;
use transit_shared::models::events::{SeatEvent, SeatEventKind};

use crate::state::AppState;

/// Booking counters, registered on a private registry so several app
/// instances (tests) can coexist in one process.
pub struct Metrics {
    registry: Registry,
    pub reservations: IntCounter,
    pub seat_conflicts: IntCounter,
    pub confirmations: IntCounter,
    pub payment_failures: IntCounter,
    pub amount_mismatches: IntCounter,
    pub expired_holds: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, help).namespace("transit"))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        Ok(Self {
            reservations: counter(&registry, "reservations_total", "Bookings created in PENDING_PAYMENT")?,
            seat_conflicts: counter(&registry, "seat_conflicts_total", "Reservations rejected because a seat was taken")?,
            confirmations: counter(&registry, "confirmations_total", "Bookings confirmed by payment")?,
            payment_failures: counter(&registry, "payment_failures_total", "Failed payment callbacks")?,
            amount_mismatches: counter(&registry, "amount_mismatches_total", "Payments whose amount differed from the booking total")?,
            expired_holds: counter(&registry, "expired_holds_total", "Pending bookings cancelled after the hold window")?,
            registry,
        })
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Counts lifecycle transitions from the seat events. Events are only
/// published for transitions that were applied, so provider retries and
/// other no-ops are not counted.
#[async_trait]
impl SeatEventPublisher for Metrics {
    async fn publish(&self, event: &SeatEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match event.kind {
            SeatEventKind::SeatsReserved => self.reservations.inc(),
            SeatEventKind::BookingConfirmed => self.confirmations.inc(),
            SeatEventKind::SeatsReleased => match event.reason.as_deref() {
                Some(r) if r == CancellationReason::ReservationExpired.as_str() => self.expired_holds.inc(),
                Some(r) if r == CancellationReason::PaymentFailed.as_str() => self.payment_failures.inc(),
                _ => {}
            },
        }
        Ok(())
    }
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            output,
        ),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; version=0.0.4")],
                String::new(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_namespaced_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.reservations.inc();
        metrics.reservations.inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("transit_reservations_total 2"));
        assert!(text.contains("transit_expired_holds_total 0"));
    }

    fn released(reason: CancellationReason) -> SeatEvent {
        SeatEvent {
            kind: SeatEventKind::SeatsReleased,
            assignment_id: uuid::Uuid::nil(),
            booking_id: uuid::Uuid::nil(),
            seats: vec![3],
            reason: Some(reason.as_str().to_string()),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_release_reasons_feed_separate_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.publish(&released(CancellationReason::ReservationExpired)).await.unwrap();
        metrics.publish(&released(CancellationReason::ReservationExpired)).await.unwrap();
        metrics.publish(&released(CancellationReason::PaymentFailed)).await.unwrap();
        metrics.publish(&released(CancellationReason::CustomerCancelled)).await.unwrap();

        assert_eq!(metrics.expired_holds.get(), 2);
        assert_eq!(metrics.payment_failures.get(), 1);
        assert_eq!(metrics.confirmations.get(), 0);
    }
}
