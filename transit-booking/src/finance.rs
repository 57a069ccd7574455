use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use transit_core::repository::BookingStore;
use transit_core::{BookingError, Clock, CoreResult};
use uuid::Uuid;

pub const MAX_BREAKDOWN_MONTHS: u32 = 24;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyIncome {
    pub bus_id: Uuid,
    pub year: i32,
    pub month: u32,
    /// Minor currency units.
    pub income: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IncomeMonth {
    pub year: i32,
    pub month: u32,
    pub income: i64,
}

/// Derives per-bus revenue from CONFIRMED bookings, bucketed by the month of
/// the departure date. Nothing is cached; every call reads the store.
pub struct IncomeAggregator {
    store: Arc<dyn BookingStore>,
    clock: Arc<dyn Clock>,
    currency: String,
}

impl IncomeAggregator {
    pub fn new(store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>, currency: String) -> Self {
        Self { store, clock, currency }
    }

    pub async fn monthly_income(&self, bus_id: Uuid, year: i32, month: u32) -> CoreResult<MonthlyIncome> {
        let (from, until) = month_bounds(year, month)?;
        self.ensure_bus(bus_id).await?;

        let income = self
            .store
            .confirmed_revenue(bus_id, from, until)
            .await?
            .iter()
            .map(|entry| entry.total_price)
            .sum();

        Ok(MonthlyIncome {
            bus_id,
            year,
            month,
            income,
            currency: self.currency.clone(),
        })
    }

    /// The `months` calendar months ending with the current one, oldest
    /// first. Months without confirmed bookings report zero.
    pub async fn income_breakdown(&self, bus_id: Uuid, months: u32) -> CoreResult<Vec<IncomeMonth>> {
        if months == 0 || months > MAX_BREAKDOWN_MONTHS {
            return Err(BookingError::validation(
                "months",
                format!("must be between 1 and {}", MAX_BREAKDOWN_MONTHS),
            ));
        }
        self.ensure_bus(bus_id).await?;

        let today = self.clock.now().date_naive();
        let window = trailing_months(today.year(), today.month(), months);
        let (first_year, first_month) = window[0];
        let (from, _) = month_bounds(first_year, first_month)?;
        let (_, until) = month_bounds(today.year(), today.month())?;

        let mut buckets: BTreeMap<(i32, u32), i64> = window.iter().map(|&key| (key, 0)).collect();
        for entry in self.store.confirmed_revenue(bus_id, from, until).await? {
            let key = (entry.departure_date.year(), entry.departure_date.month());
            if let Some(total) = buckets.get_mut(&key) {
                *total += entry.total_price;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|((year, month), income)| IncomeMonth { year, month, income })
            .collect())
    }

    async fn ensure_bus(&self, bus_id: Uuid) -> CoreResult<()> {
        match self.store.get_bus(bus_id).await? {
            Some(_) => Ok(()),
            None => Err(BookingError::not_found("bus", bus_id)),
        }
    }
}

/// First day of the month and first day of the following month.
pub fn month_bounds(year: i32, month: u32) -> CoreResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(BookingError::validation("month", format!("{} is not between 1 and 12", month)));
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

    let from = NaiveDate::from_ymd_opt(year, month, 1);
    let until = NaiveDate::from_ymd_opt(next_year, next_month, 1);
    match (from, until) {
        (Some(from), Some(until)) => Ok((from, until)),
        _ => Err(BookingError::validation("year", format!("{} is out of range", year))),
    }
}

/// `(year, month)` pairs of the `count` months ending at the given one,
/// oldest first.
fn trailing_months(year: i32, month: u32, count: u32) -> Vec<(i32, u32)> {
    let last = year * 12 + month as i32 - 1;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = last - back;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}
