use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashSet};
use transit_core::repository::{BookingStore, ReserveOutcome, RevenueEntry, Transition};
use transit_core::{
    journey_duration, AssignmentContext, Booking, BookingError, BookingStatus, Bus, CancellationReason, CoreResult,
    NewBooking, PassengerDetails, Payment, PaymentStatus, Route, RouteAssignment,
};
use transit_shared::Masked;
use uuid::Uuid;

use crate::error::{db, StoreError};

const BOOKING_COLUMNS: &str = r#"
    id, assignment_id, bus_id, route_id, departure_date,
    passenger_name, passenger_email, passenger_phone, passenger_nic,
    seat_numbers, total_price, currency, status, cancellation_reason,
    payment_method, transaction_id, created_at, expires_at, updated_at
"#;

const CONTEXT_QUERY: &str = r#"
    SELECT ra.id, ra.bus_id, ra.route_id, ra.departure_date, ra.departure_time,
           ra.assigned_seats, ra.created_at,
           b.seating_capacity AS bus_capacity, r.ticket_price
    FROM route_assignments ra
    JOIN buses b ON b.id = ra.bus_id
    JOIN routes r ON r.id = ra.route_id
"#;

/// `BookingStore` over Postgres. Reservations serialise on the
/// route_assignments row (`FOR UPDATE`); the partial unique index on
/// active booking_seats rejects anything that slips past.
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusRow {
    id: Uuid,
    registration_number: String,
    name: String,
    seating_capacity: i32,
    status: String,
    owner_id: Option<Uuid>,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    origin: String,
    destination: String,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    ticket_price: i64,
    status: String,
}

#[derive(sqlx::FromRow)]
struct ContextRow {
    id: Uuid,
    bus_id: Uuid,
    route_id: Uuid,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    assigned_seats: i32,
    created_at: DateTime<Utc>,
    bus_capacity: i32,
    ticket_price: i64,
}

#[derive(sqlx::FromRow)]
struct ScheduledRow {
    id: Uuid,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    route_departure: NaiveTime,
    route_arrival: NaiveTime,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    assignment_id: Uuid,
    bus_id: Uuid,
    route_id: Uuid,
    departure_date: NaiveDate,
    passenger_name: String,
    passenger_email: String,
    passenger_phone: String,
    passenger_nic: Option<String>,
    seat_numbers: Vec<i32>,
    total_price: i64,
    currency: String,
    status: String,
    cancellation_reason: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    method: String,
    provider_transaction_id: Option<String>,
    amount: i64,
    status: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
}

fn corrupt(table: &'static str, reason: impl ToString) -> BookingError {
    StoreError::CorruptRow {
        table,
        reason: reason.to_string(),
    }
    .into()
}

fn non_negative(table: &'static str, value: i32) -> CoreResult<u32> {
    u32::try_from(value).map_err(|_| corrupt(table, format!("negative count {}", value)))
}

impl TryFrom<BusRow> for Bus {
    type Error = BookingError;

    fn try_from(row: BusRow) -> CoreResult<Self> {
        Ok(Bus {
            id: row.id,
            registration_number: row.registration_number,
            name: row.name,
            seating_capacity: non_negative("buses", row.seating_capacity)?,
            status: row.status.parse().map_err(|e| corrupt("buses", e))?,
            owner_id: row.owner_id,
        })
    }
}

impl TryFrom<RouteRow> for Route {
    type Error = BookingError;

    fn try_from(row: RouteRow) -> CoreResult<Self> {
        Ok(Route {
            id: row.id,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            ticket_price: row.ticket_price,
            status: row.status.parse().map_err(|e| corrupt("routes", e))?,
        })
    }
}

impl TryFrom<ContextRow> for AssignmentContext {
    type Error = BookingError;

    fn try_from(row: ContextRow) -> CoreResult<Self> {
        Ok(AssignmentContext {
            assignment: RouteAssignment {
                id: row.id,
                bus_id: row.bus_id,
                route_id: row.route_id,
                departure_date: row.departure_date,
                departure_time: row.departure_time,
                assigned_seats: non_negative("route_assignments", row.assigned_seats)?,
                created_at: row.created_at,
            },
            bus_capacity: non_negative("buses", row.bus_capacity)?,
            ticket_price: row.ticket_price,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> CoreResult<Self> {
        let seats = row
            .seat_numbers
            .into_iter()
            .map(|n| non_negative("bookings", n))
            .collect::<CoreResult<Vec<u32>>>()?;
        let cancellation_reason = row
            .cancellation_reason
            .map(|r| r.parse::<CancellationReason>())
            .transpose()
            .map_err(|e| corrupt("bookings", e))?;

        Ok(Booking {
            id: row.id,
            assignment_id: row.assignment_id,
            bus_id: row.bus_id,
            route_id: row.route_id,
            departure_date: row.departure_date,
            passenger: PassengerDetails {
                name: row.passenger_name,
                email: Masked(row.passenger_email),
                phone: Masked(row.passenger_phone),
                nic: row.passenger_nic.map(Masked),
            },
            seats,
            total_price: row.total_price,
            currency: row.currency,
            status: row.status.parse().map_err(|e| corrupt("bookings", e))?,
            cancellation_reason,
            payment_method: row.payment_method,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = BookingError;

    fn try_from(row: PaymentRow) -> CoreResult<Self> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            method: row.method,
            provider_transaction_id: row.provider_transaction_id,
            amount: row.amount,
            status: row.status.parse::<PaymentStatus>().map_err(|e| corrupt("payments", e))?,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
        })
    }
}

fn bookings(rows: Vec<BookingRow>) -> CoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

async fn release_seats(tx: &mut Transaction<'_, Postgres>, booking_ids: &[Uuid]) -> CoreResult<()> {
    if booking_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("UPDATE booking_seats SET active = FALSE WHERE booking_id = ANY($1) AND active")
        .bind(booking_ids)
        .execute(&mut **tx)
        .await
        .map_err(db)?;
    Ok(())
}

/// Cancels pending holds that ended at or before `now`, optionally only on
/// one assignment or one booking.
async fn expire_holds(
    tx: &mut Transaction<'_, Postgres>,
    now: DateTime<Utc>,
    assignment_id: Option<Uuid>,
    booking_id: Option<Uuid>,
) -> CoreResult<Vec<Booking>> {
    let sql = format!(
        r#"
        UPDATE bookings
        SET status = 'CANCELLED', cancellation_reason = 'RESERVATION_EXPIRED', updated_at = $1
        WHERE status = 'PENDING_PAYMENT' AND expires_at <= $1
          AND ($2::uuid IS NULL OR assignment_id = $2)
          AND ($3::uuid IS NULL OR id = $3)
        RETURNING {}
        "#,
        BOOKING_COLUMNS
    );
    let rows: Vec<BookingRow> = sqlx::query_as(&sql)
        .bind(now)
        .bind(assignment_id)
        .bind(booking_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(db)?;

    let expired = bookings(rows)?;
    let ids: Vec<Uuid> = expired.iter().map(|b| b.id).collect();
    release_seats(tx, &ids).await?;
    Ok(expired)
}

async fn insert_payment(tx: &mut Transaction<'_, Postgres>, payment: &Payment) -> CoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO payments (id, booking_id, method, provider_transaction_id, amount, status, failure_reason, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(payment.id)
    .bind(payment.booking_id)
    .bind(&payment.method)
    .bind(&payment.provider_transaction_id)
    .bind(payment.amount)
    .bind(payment.status.as_str())
    .bind(&payment.failure_reason)
    .bind(payment.created_at)
    .execute(&mut **tx)
    .await
    .map_err(db)?;
    Ok(())
}

async fn fetch_booking(tx: &mut Transaction<'_, Postgres>, booking_id: Uuid) -> CoreResult<Booking> {
    let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
    let row: Option<BookingRow> = sqlx::query_as(&sql)
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db)?;

    row.map(Booking::try_from)
        .transpose()?
        .ok_or_else(|| BookingError::not_found("booking", booking_id))
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn get_bus(&self, bus_id: Uuid) -> CoreResult<Option<Bus>> {
        let row: Option<BusRow> = sqlx::query_as(
            "SELECT id, registration_number, name, seating_capacity, status, owner_id FROM buses WHERE id = $1",
        )
        .bind(bus_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.map(Bus::try_from).transpose()
    }

    async fn get_route(&self, route_id: Uuid) -> CoreResult<Option<Route>> {
        let row: Option<RouteRow> = sqlx::query_as(
            r#"
            SELECT id, origin, destination, departure_time, arrival_time, ticket_price, status
            FROM routes WHERE id = $1
            "#,
        )
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.map(Route::try_from).transpose()
    }

    async fn assignment_context(&self, assignment_id: Uuid) -> CoreResult<Option<AssignmentContext>> {
        let sql = format!("{} WHERE ra.id = $1", CONTEXT_QUERY);
        let row: Option<ContextRow> = sqlx::query_as(&sql)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.map(AssignmentContext::try_from).transpose()
    }

    async fn find_assignment(
        &self,
        bus_id: Uuid,
        route_id: Uuid,
        date: NaiveDate,
    ) -> CoreResult<Option<AssignmentContext>> {
        let sql = format!(
            "{} WHERE ra.bus_id = $1 AND ra.route_id = $2 AND ra.departure_date = $3 ORDER BY ra.departure_time LIMIT 1",
            CONTEXT_QUERY
        );
        let row: Option<ContextRow> = sqlx::query_as(&sql)
            .bind(bus_id)
            .bind(route_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.map(AssignmentContext::try_from).transpose()
    }

    async fn create_assignment(&self, assignment: RouteAssignment) -> CoreResult<RouteAssignment> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        // Serialises scheduling per bus.
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM buses WHERE id = $1 FOR UPDATE")
            .bind(assignment.bus_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?;
        if locked.is_none() {
            return Err(BookingError::not_found("bus", assignment.bus_id));
        }

        let route: Option<(NaiveTime, NaiveTime)> =
            sqlx::query_as("SELECT departure_time, arrival_time FROM routes WHERE id = $1")
                .bind(assignment.route_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db)?;
        let (route_departure, route_arrival) =
            route.ok_or_else(|| BookingError::not_found("route", assignment.route_id))?;
        let window = assignment.window(journey_duration(route_departure, route_arrival));

        // Journeys are under a day, so only neighbouring dates can clash.
        let neighbours: Vec<ScheduledRow> = sqlx::query_as(
            r#"
            SELECT ra.id, ra.departure_date, ra.departure_time,
                   r.departure_time AS route_departure, r.arrival_time AS route_arrival
            FROM route_assignments ra
            JOIN routes r ON r.id = ra.route_id
            WHERE ra.bus_id = $1 AND ra.departure_date BETWEEN $2 AND $3
            "#,
        )
        .bind(assignment.bus_id)
        .bind(assignment.departure_date - Duration::days(1))
        .bind(assignment.departure_date + Duration::days(1))
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        for existing in neighbours {
            let start = existing.departure_date.and_time(existing.departure_time);
            let other = transit_core::fleet::JourneyWindow {
                start,
                end: start + journey_duration(existing.route_departure, existing.route_arrival),
            };
            if other.overlaps(&window) {
                return Err(BookingError::AssignmentOverlap { existing: existing.id });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO route_assignments (id, bus_id, route_id, departure_date, departure_time, assigned_seats, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(assignment.id)
        .bind(assignment.bus_id)
        .bind(assignment.route_id)
        .bind(assignment.departure_date)
        .bind(assignment.departure_time)
        .bind(assignment.assigned_seats as i32)
        .bind(assignment.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(assignment)
    }

    async fn occupied_seats(&self, assignment_id: Uuid, now: DateTime<Utc>) -> CoreResult<BTreeSet<u32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r#"
            SELECT bs.seat_number
            FROM booking_seats bs
            JOIN bookings b ON b.id = bs.booking_id
            WHERE bs.assignment_id = $1 AND bs.active
              AND (b.status = 'CONFIRMED' OR (b.status = 'PENDING_PAYMENT' AND b.expires_at > $2))
            "#,
        )
        .bind(assignment_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.into_iter()
            .map(|(n,)| non_negative("booking_seats", n))
            .collect()
    }

    async fn reserve(&self, booking: NewBooking) -> CoreResult<ReserveOutcome> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let sql = format!("{} WHERE ra.id = $1 FOR UPDATE OF ra", CONTEXT_QUERY);
        let context: AssignmentContext = sqlx::query_as::<_, ContextRow>(&sql)
            .bind(booking.assignment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
            .map(AssignmentContext::try_from)
            .transpose()?
            .ok_or_else(|| BookingError::not_found("route assignment", booking.assignment_id))?;

        let expired = expire_holds(&mut tx, booking.created_at, Some(booking.assignment_id), None).await?;

        let requested: Vec<i32> = booking.seats.iter().map(|&n| n as i32).collect();
        let taken: Vec<(i32,)> = sqlx::query_as(
            "SELECT seat_number FROM booking_seats WHERE assignment_id = $1 AND active AND seat_number = ANY($2)",
        )
        .bind(booking.assignment_id)
        .bind(&requested)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        if !taken.is_empty() {
            let taken: HashSet<i32> = taken.into_iter().map(|(n,)| n).collect();
            let seats = booking.seats.iter().copied().filter(|n| taken.contains(&(*n as i32))).collect();
            // keep the expiries even though nothing is inserted
            tx.commit().await.map_err(db)?;
            return Ok(ReserveOutcome::Conflict { seats, expired });
        }

        let created = Booking::from_new(booking, &context);
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, assignment_id, bus_id, route_id, departure_date,
                passenger_name, passenger_email, passenger_phone, passenger_nic,
                seat_numbers, total_price, currency, status,
                created_at, expires_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(created.id)
        .bind(created.assignment_id)
        .bind(created.bus_id)
        .bind(created.route_id)
        .bind(created.departure_date)
        .bind(&created.passenger.name)
        .bind(created.passenger.email.expose())
        .bind(created.passenger.phone.expose())
        .bind(created.passenger.nic.as_ref().map(|n| n.expose().clone()))
        .bind(&requested)
        .bind(created.total_price)
        .bind(&created.currency)
        .bind(created.status.as_str())
        .bind(created.created_at)
        .bind(created.expires_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO booking_seats (booking_id, assignment_id, seat_number)
            SELECT $1, $2, UNNEST($3::int4[])
            "#,
        )
        .bind(created.id)
        .bind(created.assignment_id)
        .bind(&requested)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    // the aborted transaction rolls the expiries back too
                    return Ok(ReserveOutcome::Conflict {
                        seats: created.seats,
                        expired: Vec::new(),
                    });
                }
            }
            return Err(db(e));
        }

        tx.commit().await.map_err(db)?;
        Ok(ReserveOutcome::Reserved { booking: created, expired })
    }

    async fn get_booking(&self, booking_id: Uuid) -> CoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.map(Booking::try_from).transpose()
    }

    async fn confirm_booking(
        &self,
        booking_id: Uuid,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = 'CONFIRMED', payment_method = $2, transaction_id = $3, updated_at = $4
            WHERE id = $1 AND status = 'PENDING_PAYMENT' AND expires_at > $4
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .bind(&payment.method)
            .bind(&payment.provider_transaction_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?;

        let transition = match row {
            Some(row) => {
                insert_payment(&mut tx, payment).await?;
                Transition::Applied(Booking::try_from(row)?)
            }
            None => match expire_holds(&mut tx, now, None, Some(booking_id)).await?.pop() {
                Some(expired) => Transition::Expired(expired),
                None => Transition::Unchanged(fetch_booking(&mut tx, booking_id).await?),
            },
        };

        tx.commit().await.map_err(db)?;
        Ok(transition)
    }

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        from: &[BookingStatus],
        reason: CancellationReason,
        payment: Option<&Payment>,
        now: DateTime<Utc>,
    ) -> CoreResult<Transition> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let allowed: Vec<&str> = from.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            r#"
            UPDATE bookings
            SET status = 'CANCELLED', cancellation_reason = $3,
                payment_method = COALESCE($4, payment_method),
                transaction_id = COALESCE($5, transaction_id),
                updated_at = $6
            WHERE id = $1 AND status = ANY($2)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .bind(&allowed)
            .bind(reason.as_str())
            .bind(payment.map(|p| p.method.clone()))
            .bind(payment.and_then(|p| p.provider_transaction_id.clone()))
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?;

        let transition = match row {
            Some(row) => {
                release_seats(&mut tx, &[booking_id]).await?;
                if let Some(payment) = payment {
                    insert_payment(&mut tx, payment).await?;
                }
                Transition::Applied(Booking::try_from(row)?)
            }
            None => Transition::Unchanged(fetch_booking(&mut tx, booking_id).await?),
        };

        tx.commit().await.map_err(db)?;
        Ok(transition)
    }

    async fn expire_stale_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Booking>> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let expired = expire_holds(&mut tx, now, None, None).await?;
        tx.commit().await.map_err(db)?;
        Ok(expired)
    }

    async fn bookings_for_bus(&self, bus_id: Uuid) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE bus_id = $1 ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(bus_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        bookings(rows)
    }

    async fn bookings_for_passenger(&self, email: &str) -> CoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE lower(passenger_email) = lower($1) ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        bookings(rows)
    }

    async fn confirmed_revenue(
        &self,
        bus_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> CoreResult<Vec<RevenueEntry>> {
        let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
            r#"
            SELECT departure_date, total_price
            FROM bookings
            WHERE bus_id = $1 AND status = 'CONFIRMED'
              AND departure_date >= $2 AND departure_date < $3
            "#,
        )
        .bind(bus_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        Ok(rows
            .into_iter()
            .map(|(departure_date, total_price)| RevenueEntry { departure_date, total_price })
            .collect())
    }

    async fn payments_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, booking_id, method, provider_transaction_id, amount, status, failure_reason, created_at
            FROM payments WHERE booking_id = $1 ORDER BY created_at
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.into_iter().map(Payment::try_from).collect()
    }
}
