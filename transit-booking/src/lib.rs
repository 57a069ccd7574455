pub mod expiry;
pub mod finance;
pub mod manager;
pub mod memory;
pub mod occupancy;
pub mod publisher;
pub mod reconciliation;
pub mod scheduler;

#[cfg(test)]
mod testing;

use chrono::Duration;
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::Clock;

pub use expiry::ExpirySweeper;
pub use finance::{IncomeAggregator, IncomeMonth, MonthlyIncome};
pub use manager::{ReservationManager, ReserveRequest};
pub use memory::InMemoryBookingStore;
pub use occupancy::{OccupancyResolver, SeatState, SeatStatusSummary, SeatView};
pub use publisher::{BroadcastPublisher, EventFanout};
pub use reconciliation::PaymentReconciler;
pub use scheduler::{AssignmentScheduler, NewAssignment};

/// Tunables shared by the booking components.
#[derive(Debug, Clone)]
pub struct BookingRules {
    /// How long a PENDING_PAYMENT booking holds its seats.
    pub hold: Duration,
    pub currency: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            hold: Duration::minutes(15),
            currency: "LKR".to_string(),
        }
    }
}

/// The booking core wired against one store, clock and event fan-out.
#[derive(Clone)]
pub struct BookingServices {
    pub occupancy: Arc<OccupancyResolver>,
    pub reservations: Arc<ReservationManager>,
    pub payments: Arc<PaymentReconciler>,
    pub income: Arc<IncomeAggregator>,
    pub scheduler: Arc<AssignmentScheduler>,
    pub sweeper: Arc<ExpirySweeper>,
}

impl BookingServices {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        events: EventFanout,
        rules: BookingRules,
    ) -> Self {
        Self {
            occupancy: Arc::new(OccupancyResolver::new(store.clone(), clock.clone())),
            reservations: Arc::new(ReservationManager::new(
                store.clone(),
                clock.clone(),
                events.clone(),
                rules.clone(),
            )),
            payments: Arc::new(PaymentReconciler::new(store.clone(), clock.clone(), events.clone())),
            income: Arc::new(IncomeAggregator::new(store.clone(), clock.clone(), rules.currency.clone())),
            scheduler: Arc::new(AssignmentScheduler::new(store.clone(), clock.clone())),
            sweeper: Arc::new(ExpirySweeper::new(store, clock, events)),
        }
    }
}
