use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use transita_core::{ReservationError, ReservationStore, Seat, Trip, TripSpec, TripUpdate};

/// Owns trip records and the seats provisioned for them.
pub struct SeatInventory {
    store: Arc<dyn ReservationStore>,
}

impl SeatInventory {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Creates a trip and provisions its seats in one atomic unit. Labels
    /// are deterministic: S1..SN in seat order. Validation failures persist
    /// nothing.
    pub async fn create_trip(&self, spec: TripSpec) -> Result<Trip, ReservationError> {
        spec.validate()?;
        let trip = Trip::new(spec);
        let seats: Vec<Seat> = (1..=trip.seat_count)
            .map(|n| Seat::new(trip.id, format!("S{}", n)))
            .collect();
        self.store.create_trip(trip.clone(), seats).await?;
        info!(trip_id = %trip.id, seats = trip.seat_count, "trip created");
        Ok(trip)
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> Result<Trip, ReservationError> {
        self.store
            .get_trip(trip_id)
            .await?
            .ok_or(ReservationError::TripNotFound(trip_id))
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, ReservationError> {
        self.store.list_trips().await
    }

    /// Applies a partial update. The seat set is fixed at provisioning time,
    /// so `TripUpdate` carries no seat_count.
    pub async fn update_trip(
        &self,
        trip_id: Uuid,
        changes: TripUpdate,
    ) -> Result<Trip, ReservationError> {
        let mut trip = self.get_trip(trip_id).await?;
        changes.apply(&mut trip);
        trip.validate()?;
        self.store.update_trip(trip.clone()).await?;
        info!(trip_id = %trip.id, "trip updated");
        Ok(trip)
    }

    pub async fn delete_trip(&self, trip_id: Uuid) -> Result<(), ReservationError> {
        self.store.delete_trip(trip_id).await?;
        info!(trip_id = %trip_id, "trip deleted");
        Ok(())
    }

    pub async fn get_seat(&self, seat_id: Uuid) -> Result<Seat, ReservationError> {
        self.store
            .get_seat(seat_id)
            .await?
            .ok_or(ReservationError::SeatNotFound(seat_id))
    }

    /// Seats of a trip in provisioning order.
    pub async fn list_seats(&self, trip_id: Uuid) -> Result<Vec<Seat>, ReservationError> {
        self.store.list_seats(trip_id).await
    }
}
