use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::BookingError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusStatus {
    Pending,
    Approved,
    Rejected,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Pending => "PENDING",
            BusStatus::Approved => "APPROVED",
            BusStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for BusStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BusStatus::Pending),
            "APPROVED" => Ok(BusStatus::Approved),
            "REJECTED" => Ok(BusStatus::Rejected),
            other => Err(BookingError::validation("busStatus", format!("unknown status {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Active,
    Inactive,
    Maintenance,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Active => "ACTIVE",
            RouteStatus::Inactive => "INACTIVE",
            RouteStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl FromStr for RouteStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(RouteStatus::Active),
            "INACTIVE" => Ok(RouteStatus::Inactive),
            "MAINTENANCE" => Ok(RouteStatus::Maintenance),
            other => Err(BookingError::validation("routeStatus", format!("unknown status {}", other))),
        }
    }
}

/// A coach registered by an owner. Capacity is fixed once approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: Uuid,
    pub registration_number: String,
    pub name: String,
    pub seating_capacity: u32,
    pub status: BusStatus,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    /// Minor currency units per seat.
    pub ticket_price: i64,
    pub status: RouteStatus,
}

impl Route {
    pub fn journey_duration(&self) -> Duration {
        journey_duration(self.departure_time, self.arrival_time)
    }
}

/// Journey length between two timetable times; an arrival earlier than the
/// departure means the journey runs past midnight.
pub fn journey_duration(departure: NaiveTime, arrival: NaiveTime) -> Duration {
    let diff = arrival - departure;
    if diff < Duration::zero() {
        diff + Duration::days(1)
    } else {
        diff
    }
}

/// A bus operating a route on one date at one time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteAssignment {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub route_id: Uuid,
    pub departure_date: NaiveDate,
    pub departure_time: NaiveTime,
    pub assigned_seats: u32,
    pub created_at: DateTime<Utc>,
}

impl RouteAssignment {
    pub fn departs_at(&self) -> NaiveDateTime {
        self.departure_date.and_time(self.departure_time)
    }

    pub fn window(&self, journey: Duration) -> JourneyWindow {
        let start = self.departs_at();
        JourneyWindow { start, end: start + journey }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JourneyWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl JourneyWindow {
    /// Half-open intervals; two journeys starting at the same instant always
    /// overlap, even when a route has no recorded duration.
    pub fn overlaps(&self, other: &JourneyWindow) -> bool {
        self.start == other.start || (self.start < other.end && other.start < self.end)
    }
}

/// Everything the booking core needs to know about an assignment, resolved
/// from the admin-owned bus and route records in one read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentContext {
    pub assignment: RouteAssignment,
    pub bus_capacity: u32,
    pub ticket_price: i64,
}

impl AssignmentContext {
    /// Highest seat number that may be reserved.
    pub fn seat_limit(&self) -> u32 {
        self.assignment.assigned_seats.min(self.bus_capacity)
    }
}
