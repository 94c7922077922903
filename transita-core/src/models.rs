use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReservationError;

/// Seat occupancy state. A seat moves from Available to Booked exactly once,
/// through the reservation commit, and never back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Booked => "BOOKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(SeatStatus::Available),
            "BOOKED" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// A scheduled bus run. `number` is a stable external reference, unique
/// across trips. Prices are fixed-point minor units (cents) to avoid
/// floating-point drift on currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub name: String,
    pub number: String,
    pub origin: String,
    pub destination: String,
    pub features: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub seat_count: i32,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(spec: TripSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: spec.name,
            number: spec.number,
            origin: spec.origin,
            destination: spec.destination,
            features: spec.features,
            departure_at: spec.departure_at,
            arrival_at: spec.arrival_at,
            seat_count: spec.seat_count,
            price_cents: spec.price_cents,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), ReservationError> {
        validate_fields(
            &self.name,
            &self.number,
            &self.origin,
            &self.destination,
            self.departure_at,
            self.arrival_at,
            self.seat_count,
            self.price_cents,
        )
    }
}

/// Input for trip creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSpec {
    pub name: String,
    pub number: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub features: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub arrival_at: DateTime<Utc>,
    pub seat_count: i32,
    pub price_cents: i64,
}

impl TripSpec {
    pub fn validate(&self) -> Result<(), ReservationError> {
        validate_fields(
            &self.name,
            &self.number,
            &self.origin,
            &self.destination,
            self.departure_at,
            self.arrival_at,
            self.seat_count,
            self.price_cents,
        )
    }
}

/// Partial trip update. `seat_count` is deliberately absent: the seat set is
/// fixed when the trip is provisioned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripUpdate {
    pub name: Option<String>,
    pub number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub features: Option<String>,
    pub departure_at: Option<DateTime<Utc>>,
    pub arrival_at: Option<DateTime<Utc>>,
    pub price_cents: Option<i64>,
}

impl TripUpdate {
    pub fn apply(self, trip: &mut Trip) {
        if let Some(name) = self.name {
            trip.name = name;
        }
        if let Some(number) = self.number {
            trip.number = number;
        }
        if let Some(origin) = self.origin {
            trip.origin = origin;
        }
        if let Some(destination) = self.destination {
            trip.destination = destination;
        }
        if let Some(features) = self.features {
            trip.features = Some(features);
        }
        if let Some(departure_at) = self.departure_at {
            trip.departure_at = departure_at;
        }
        if let Some(arrival_at) = self.arrival_at {
            trip.arrival_at = arrival_at;
        }
        if let Some(price_cents) = self.price_cents {
            trip.price_cents = price_cents;
        }
    }
}

fn validate_fields(
    name: &str,
    number: &str,
    origin: &str,
    destination: &str,
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
    seat_count: i32,
    price_cents: i64,
) -> Result<(), ReservationError> {
    if name.trim().is_empty() {
        return Err(ReservationError::Validation("name must not be empty".to_string()));
    }
    if number.trim().is_empty() {
        return Err(ReservationError::Validation("number must not be empty".to_string()));
    }
    if origin.trim().is_empty() {
        return Err(ReservationError::Validation("origin must not be empty".to_string()));
    }
    if destination.trim().is_empty() {
        return Err(ReservationError::Validation(
            "destination must not be empty".to_string(),
        ));
    }
    if seat_count <= 0 {
        return Err(ReservationError::Validation(
            "seat_count must be positive".to_string(),
        ));
    }
    if price_cents < 0 {
        return Err(ReservationError::Validation(
            "price_cents must not be negative".to_string(),
        ));
    }
    if arrival_at <= departure_at {
        return Err(ReservationError::Validation(
            "arrival_at must be after departure_at".to_string(),
        ));
    }
    Ok(())
}

/// A bookable unit of capacity on a trip. A seat belongs to exactly one trip
/// for its lifetime. Labels are free-form strings ("S1", "12A", ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub label: String,
    pub status: SeatStatus,
}

impl Seat {
    pub fn new(trip_id: Uuid, label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            label,
            status: SeatStatus::Available,
        }
    }

    pub fn is_booked(&self) -> bool {
        self.status == SeatStatus::Booked
    }
}

/// The durable record linking one user to one seat on one trip.
/// Created exactly once by the reservation commit, never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, trip_id: Uuid, seat_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            trip_id,
            seat_id,
            created_at: Utc::now(),
        }
    }
}

/// A booking joined with the current trip and seat state at read time.
///
/// Price, origin, destination and seat label are not snapshotted: a price
/// correction on the trip is reflected in views of bookings made before it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trip_id: Uuid,
    pub seat_id: Uuid,
    pub seat_label: String,
    pub origin: String,
    pub destination: String,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl BookingView {
    pub fn resolve(booking: &Booking, trip: &Trip, seat: &Seat) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            trip_id: booking.trip_id,
            seat_id: booking.seat_id,
            seat_label: seat.label.clone(),
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            price_cents: trip.price_cents,
            created_at: booking.created_at,
        }
    }
}
