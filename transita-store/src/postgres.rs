use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use transita_core::{Booking, ReservationError, ReservationStore, Seat, SeatStatus, Trip};

/// Postgres-backed reservation store.
///
/// The reservation commit is a short transaction scoped to one seat row: a
/// conditional UPDATE claims the seat, the booking INSERT lands in the same
/// transaction, and a unique index on bookings.seat_id backstops the claim at
/// the storage layer. Queries are runtime-checked so the crate builds without
/// a live DATABASE_URL.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("migrations completed");
        Ok(())
    }
}

fn storage(err: sqlx::Error) -> ReservationError {
    ReservationError::Storage(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    name: String,
    number: String,
    origin: String,
    destination: String,
    features: Option<String>,
    departure_at: DateTime<Utc>,
    arrival_at: DateTime<Utc>,
    seat_count: i32,
    price_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            name: row.name,
            number: row.number,
            origin: row.origin,
            destination: row.destination,
            features: row.features,
            departure_at: row.departure_at,
            arrival_at: row.arrival_at,
            seat_count: row.seat_count,
            price_cents: row.price_cents,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    trip_id: Uuid,
    label: String,
    status: String,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: row.id,
            trip_id: row.trip_id,
            label: row.label,
            // Unknown markers never reach the table; treat them as booked so
            // a bad row can not be double-sold.
            status: SeatStatus::parse(&row.status).unwrap_or(SeatStatus::Booked),
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    trip_id: Uuid,
    seat_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            trip_id: row.trip_id,
            seat_id: row.seat_id,
            created_at: row.created_at,
        }
    }
}

const TRIP_COLUMNS: &str = "id, name, number, origin, destination, features, departure_at, arrival_at, seat_count, price_cents, created_at";

#[async_trait]
impl ReservationStore for PgStore {
    async fn create_trip(&self, trip: Trip, seats: Vec<Seat>) -> Result<(), ReservationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            "INSERT INTO trips (id, name, number, origin, destination, features, departure_at, arrival_at, seat_count, price_cents, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(trip.id)
        .bind(&trip.name)
        .bind(&trip.number)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(&trip.features)
        .bind(trip.departure_at)
        .bind(trip.arrival_at)
        .bind(trip.seat_count)
        .bind(trip.price_cents)
        .bind(trip.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ReservationError::Validation(format!("trip number already exists: {}", trip.number))
            } else {
                storage(e)
            }
        })?;

        for (position, seat) in seats.iter().enumerate() {
            sqlx::query(
                "INSERT INTO seats (id, trip_id, label, status, position)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(seat.id)
            .bind(seat.trip_id)
            .bind(&seat.label)
            .bind(seat.status.as_str())
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, ReservationError> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips WHERE id = $1",
            TRIP_COLUMNS
        ))
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(Trip::from))
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, ReservationError> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips ORDER BY created_at, number",
            TRIP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    async fn update_trip(&self, trip: Trip) -> Result<(), ReservationError> {
        let result = sqlx::query(
            "UPDATE trips SET name = $1, number = $2, origin = $3, destination = $4,
                 features = $5, departure_at = $6, arrival_at = $7, price_cents = $8
             WHERE id = $9",
        )
        .bind(&trip.name)
        .bind(&trip.number)
        .bind(&trip.origin)
        .bind(&trip.destination)
        .bind(&trip.features)
        .bind(trip.departure_at)
        .bind(trip.arrival_at)
        .bind(trip.price_cents)
        .bind(trip.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ReservationError::Validation(format!("trip number already exists: {}", trip.number))
            } else {
                storage(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(ReservationError::TripNotFound(trip.id));
        }
        Ok(())
    }

    async fn delete_trip(&self, trip_id: Uuid) -> Result<(), ReservationError> {
        // Seats and bookings go with the trip via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM trips WHERE id = $1")
            .bind(trip_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() == 0 {
            return Err(ReservationError::TripNotFound(trip_id));
        }
        Ok(())
    }

    async fn get_seat(&self, seat_id: Uuid) -> Result<Option<Seat>, ReservationError> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT id, trip_id, label, status FROM seats WHERE id = $1",
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(Seat::from))
    }

    async fn list_seats(&self, trip_id: Uuid) -> Result<Vec<Seat>, ReservationError> {
        let trip = sqlx::query("SELECT 1 FROM trips WHERE id = $1")
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        if trip.is_none() {
            return Err(ReservationError::TripNotFound(trip_id));
        }

        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, trip_id, label, status FROM seats WHERE trip_id = $1 ORDER BY position",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn reserve_seat(
        &self,
        user_id: Uuid,
        seat_id: Uuid,
    ) -> Result<Booking, ReservationError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // One-row compare-and-set: only an Available seat can be claimed, and
        // only one transaction gets the row.
        let claimed = sqlx::query(
            "UPDATE seats SET status = 'BOOKED'
             WHERE id = $1 AND status = 'AVAILABLE'
             RETURNING trip_id",
        )
        .bind(seat_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let trip_id: Uuid = match claimed {
            Some(row) => row.try_get("trip_id").map_err(storage)?,
            None => {
                // Dropping the transaction rolls it back; nothing was written.
                let exists = sqlx::query("SELECT 1 FROM seats WHERE id = $1")
                    .bind(seat_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage)?;
                return Err(match exists {
                    Some(_) => ReservationError::AlreadyBooked(seat_id),
                    None => ReservationError::SeatNotFound(seat_id),
                });
            }
        };

        let booking = Booking::new(user_id, trip_id, seat_id);
        sqlx::query(
            "INSERT INTO bookings (id, user_id, trip_id, seat_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.trip_id)
        .bind(booking.seat_id)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ReservationError::AlreadyBooked(seat_id)
            } else {
                storage(e)
            }
        })?;

        tx.commit().await.map_err(storage)?;
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, trip_id, seat_id, created_at FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(Booking::from))
    }

    async fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, ReservationError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, trip_id, seat_id, created_at FROM bookings
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }
}
