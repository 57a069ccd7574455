use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use transit_core::repository::{BookingStore, ReserveOutcome, RevenueEntry, Transition};
use transit_core::{
    AssignmentContext, Booking, BookingError, BookingStatus, Bus, CancellationReason, CoreResult,
    NewBooking, Payment, Route, RouteAssignment,
};

#[derive(Default)]
struct Inner {
    buses: HashMap<Uuid, Bus>,
    routes: HashMap<Uuid, Route>,
    assignments: HashMap<Uuid, RouteAssignment>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<Payment>,
}

impl Inner {
    fn context(&self, assignment_id: Uuid) -> Option<AssignmentContext> {
        let assignment = self.assignments.get(&assignment_id)?;
        let bus = self.buses.get(&assignment.bus_id)?;
        let route = self.routes.get(&assignment.route_id)?;

        Some(AssignmentContext {
            assignment: assignment.clone(),
            bus_capacity: bus.seating_capacity,
            ticket_price: route.ticket_price,
        })
    }

    fn occupied(&self, assignment_id: Uuid, now: DateTime<Utc>) -> BTreeSet<u32> {
        self.bookings
            .values()
            .filter(|b| b.assignment_id == assignment_id && b.holds_seats_at(now))
            .flat_map(|b| b.seats.iter().copied())
            .collect()
    }

    fn expire_holds<F>(&mut self, now: DateTime<Utc>, filter: F) -> Vec<Booking>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut expired = Vec::new();
        for booking in self.bookings.values_mut() {
            if booking.is_hold_expired(now) && filter(booking) {
                booking.cancel(CancellationReason::ReservationExpired, now);
                expired.push(booking.clone());
            }
        }
        expired
    }

    fn booking_mut(&mut self, booking_id: Uuid) -> CoreResult<&mut Booking> {
        self.bookings
            .get_mut(&booking_id)
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }
}

/// Process-local store. Every write takes the single write lock and never
/// awaits while holding it, so check-then-insert on one assignment is
/// atomic. Used for tests and for running the API without a database.
#[derive(Default)]
pub struct InMemoryBookingStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bus(&self, bus: Bus) -> CoreResult<()> {
        self.write()?.buses.insert(bus.id, bus);
        Ok(())
    }

    pub fn insert_route(&self, route: Route) -> CoreResult<()> {
        self.write()?.routes.insert(route.id, route);
        Ok(())
    }

    /// Simulates losing the backing store; every call fails with
    /// `SourceUnavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> CoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BookingError::SourceUnavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, Inner>> {
        self.check_online()?;
        self.inner
            .read()
            .map_err(|_| BookingError::SourceUnavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> CoreResult<RwLockWriteGuard<'_, Inner>> {
        self.check_online()?;
        self.inner
            .write()
            .map_err(|_| BookingError::SourceUnavailable("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get_bus(&self, bus_id: Uuid) -> CoreResult<Option<Bus>> {
        Ok(self.read()?.buses.get(&bus_id).cloned())
    }

    async fn get_route(&self, route_id: Uuid) -> CoreResult<Option<Route>> {
        Ok(self.read()?.routes.get(&route_id).cloned())
    }

    async fn assignment_context(&self, assignment_id: Uuid) -> CoreResult<Option<AssignmentContext>> {
        Ok(self.read()?.context(assignment_id))
    }

    async fn find_assignment(
        &self,
        bus_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Option<AssignmentContext>> {
        let inner = self.read()?;
        let earliest = inner
            .assignments
            .values()
            .filter(|a| a.bus_id == bus_id && a.route_id == route_id && a.departure_date == date)
            .min_by_key(|a| a.departure_time)
            .map(|a| a.id);

        Ok(earliest.and_then(|id| inner.context(id)))
    }

    async fn create_assignment(&self, assignment: RouteAssignment) -> CoreResult<RouteAssignment> {
        let mut inner = self.write()?;

        let route = inner
            .routes
            .get(&assignment.route_id)
            .ok_or_else(|| BookingError::not_found("route", assignment.route_id))?;
        let window = assignment.window(route.journey_duration());

        let clash = inner
            .assignments
            .values()
            .filter(|existing| existing.bus_id == assignment.bus_id)
            .find(|existing| {
                let journey = inner
                    .routes
                    .get(&existing.route_id)
                    .map(|r| r.journey_duration())
                    .unwrap_or_else(chrono::Duration::zero);
                existing.window(journey).overlaps(&window)
            });

        if let Some(existing) = clash {
            return Err(BookingError::AssignmentOverlap { existing: existing.id });
        }

        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn occupied_seats(&self, assignment_id: Uuid, now: DateTime<Utc>) -> CoreResult<BTreeSet<u32>> {
        Ok(self.read()?.occupied(assignment_id, now))
    }

    async fn reserve(&self, booking: NewBooking) -> CoreResult<ReserveOutcome> {
        let mut inner = self.write()?;

        let context = inner
            .context(booking.assignment_id)
            .ok_or_else(|| BookingError::not_found("route assignment", booking.assignment_id))?;

        let now = booking.created_at;
        let assignment_id = booking.assignment_id;
        let expired = inner.expire_holds(now, |b| b.assignment_id == assignment_id);

        let occupied = inner.occupied(assignment_id, now);
        let conflicts: Vec<u32> = booking
            .seats
            .iter()
            .copied()
            .filter(|seat| occupied.contains(seat))
            .collect();

        if !conflicts.is_empty() {
            return Ok(ReserveOutcome::Conflict { seats: conflicts, expired });
        }

        let created = Booking::from_new(booking, &context);
        inner.bookings.insert(created.id, created.clone());

        Ok(ReserveOutcome::Reserved { booking: created, expired })
    }

    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.read()?.bookings.get(&booking_id).cloned())
    }

    async fn confirm_booking(
        &self,
        booking_id: Uuid,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        let mut inner = self.write()?;
        let booking = inner.booking_mut(booking_id)?;

        if booking.status != BookingStatus::PendingPayment {
            return Ok(Transition::Unchanged(booking.clone()));
        }

        if booking.is_hold_expired(now) {
            booking.cancel(CancellationReason::ReservationExpired, now);
            return Ok(Transition::Expired(booking.clone()));
        }

        booking.status = BookingStatus::Confirmed;
        booking.payment_method = Some(payment.method.clone());
        booking.transaction_id = payment.provider_transaction_id.clone();
        booking.updated_at = now;
        let confirmed = booking.clone();

        inner.payments.push(payment.clone());
        Ok(Transition::Applied(confirmed))
    }

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        reason: CancellationReason,
        payment: Option<&Payment>,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        let mut inner = self.write()?;
        let booking = inner.booking_mut(booking_id)?;

        if !from.contains(&booking.status) {
            return Ok(Transition::Unchanged(booking.clone()));
        }

        booking.cancel(reason, now);
        if let Some(payment) = payment {
            booking.payment_method = Some(payment.method.clone());
            booking.transaction_id = payment.provider_transaction_id.clone();
        }
        let cancelled = booking.clone();

        if let Some(payment) = payment {
            inner.payments.push(payment.clone());
        }
        Ok(Transition::Applied(cancelled))
    }

    async fn expire_stale_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Booking>> {
        Ok(self.write()?.expire_holds(now, |_| true))
    }

    async fn bookings_for_bus(&self, bus_id: Uuid) -> CoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .read()?
            .bookings
            .values()
            .filter(|b| b.bus_id == bus_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn bookings_for_passenger(&self, email: &str) -> CoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .read()?
            .bookings
            .values()
            .filter(|b| b.passenger.email.expose().eq_ignore_ascii_case(email))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn confirmed_revenue(
        &self,
        bus_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> CoreResult<Vec<RevenueEntry>> {
        Ok(self
            .read()?
            .bookings
            .values()
            .filter(|b| {
                b.bus_id == bus_id
                    && b.status == BookingStatus::Confirmed
                    && b.departure_date >= from
                    && b.departure_date < until
            })
            .map(|b| RevenueEntry {
                departure_date: b.departure_date,
                total_price: b.total_price,
            })
            .collect())
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Payment>> {
        Ok(self
            .read()?
            .payments
            .iter()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }
}
