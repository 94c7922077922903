use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ReservationError;
use crate::models::{Booking, Seat, Trip};

/// Storage seam for the reservation service.
///
/// `reserve_seat` is the atomic check-and-commit primitive: an implementation
/// must read the seat status, flip it to Booked, and append the booking as a
/// single unit, with exclusivity scoped to that one seat. No caller may ever
/// observe a flipped seat without its booking or a booking without its flip.
///
/// `create_trip` must persist the trip and its full seat set atomically:
/// a failure partway leaves no orphaned trip and no partial seats.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create_trip(&self, trip: Trip, seats: Vec<Seat>) -> Result<(), ReservationError>;

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, ReservationError>;

    async fn list_trips(&self) -> Result<Vec<Trip>, ReservationError>;

    async fn update_trip(&self, trip: Trip) -> Result<(), ReservationError>;

    /// Removes the trip together with its seats and bookings.
    async fn delete_trip(&self, trip_id: Uuid) -> Result<(), ReservationError>;

    async fn get_seat(&self, seat_id: Uuid) -> Result<Option<Seat>, ReservationError>;

    /// Seats of a trip in provisioning order. Errors with `TripNotFound` for
    /// an unknown trip.
    async fn list_seats(&self, trip_id: Uuid) -> Result<Vec<Seat>, ReservationError>;

    /// Atomically books the seat for the user, or rejects with
    /// `AlreadyBooked` / `SeatNotFound` leaving no side effects.
    async fn reserve_seat(&self, user_id: Uuid, seat_id: Uuid)
        -> Result<Booking, ReservationError>;

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError>;

    /// Bookings of one user ordered by creation time ascending.
    async fn list_bookings_for_user(&self, user_id: Uuid)
        -> Result<Vec<Booking>, ReservationError>;
}
