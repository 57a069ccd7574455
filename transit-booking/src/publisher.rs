use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;
use transit_core::repository::SeatEventPublisher;
use transit_core::Booking;
use transit_shared::models::events::{SeatEvent, SeatEventKind};

/// Sends seat events to every configured sink. Sink failures are logged and
/// never fail the booking operation that produced the event.
#[derive(Clone, Default)]
pub struct EventFanout {
    sinks: Vec<Arc<dyn SeatEventPublisher>>,
}

impl EventFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn SeatEventPublisher>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub async fn publish(&self, event: SeatEvent) {
        let results = join_all(self.sinks.iter().map(|sink| sink.publish(&event))).await;
        for result in results {
            if let Err(e) = result {
                tracing::warn!(
                    "Failed to publish {:?} for booking {}: {}",
                    event.kind,
                    event.booking_id,
                    e
                );
            }
        }
    }

    pub async fn booking_event(&self, kind: SeatEventKind, booking: &Booking) {
        self.publish(seat_event(kind, booking)).await;
    }
}

pub fn seat_event(kind: SeatEventKind, booking: &Booking) -> SeatEvent {
    SeatEvent {
        kind,
        assignment_id: booking.assignment_id,
        booking_id: booking.id,
        seats: booking.seats.clone(),
        reason: booking.cancellation_reason.map(|r| r.as_str().to_string()),
        timestamp: Utc::now().timestamp(),
    }
}

/// In-process channel feeding the live seat streams.
#[derive(Clone)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<SeatEvent>,
}

impl BroadcastPublisher {
    pub fn new(tx: broadcast::Sender<SeatEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SeatEventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &SeatEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // No subscribers is the normal idle state.
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}
