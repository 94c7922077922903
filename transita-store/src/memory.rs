use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use transita_core::{Booking, ReservationError, ReservationStore, Seat, SeatStatus, Trip};

/// One seat behind its own lock. Reservations on different seats never
/// contend with each other.
struct SeatSlot {
    seat: Mutex<Seat>,
}

/// In-memory reservation store.
///
/// Concurrency model: the status check, the Available -> Booked flip, and the
/// ledger append for a seat all happen while that seat's mutex is held, so
/// under K concurrent reserves exactly one wins and the rest observe
/// AlreadyBooked. The commit keeps the seat-map read lock for its whole
/// critical section: reserves on different seats share it and stay parallel,
/// while `delete_trip`'s write lock can not interleave with an in-flight
/// commit and strand a booking for a removed trip. Lock order is seat map ->
/// seat slot -> ledger, never reversed, and no lock is held across an await
/// point.
pub struct MemoryStore {
    trips: RwLock<HashMap<Uuid, Trip>>,
    seats: RwLock<HashMap<Uuid, Arc<SeatSlot>>>,
    trip_seats: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    ledger: Mutex<Vec<Booking>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            trips: RwLock::new(HashMap::new()),
            seats: RwLock::new(HashMap::new()),
            trip_seats: RwLock::new(HashMap::new()),
            ledger: Mutex::new(Vec::new()),
        }
    }

    fn number_taken(trips: &HashMap<Uuid, Trip>, number: &str, except: Uuid) -> bool {
        trips
            .values()
            .any(|t| t.number == number && t.id != except)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn create_trip(&self, trip: Trip, seats: Vec<Seat>) -> Result<(), ReservationError> {
        let mut trips = self.trips.write().unwrap();
        if Self::number_taken(&trips, &trip.number, trip.id) {
            return Err(ReservationError::Validation(format!(
                "trip number already exists: {}",
                trip.number
            )));
        }

        let mut seat_map = self.seats.write().unwrap();
        let mut trip_seats = self.trip_seats.write().unwrap();

        let order: Vec<Uuid> = seats.iter().map(|s| s.id).collect();
        for seat in seats {
            seat_map.insert(
                seat.id,
                Arc::new(SeatSlot {
                    seat: Mutex::new(seat),
                }),
            );
        }
        trip_seats.insert(trip.id, order);
        trips.insert(trip.id, trip);
        Ok(())
    }

    async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>, ReservationError> {
        Ok(self.trips.read().unwrap().get(&trip_id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, ReservationError> {
        let mut trips: Vec<Trip> = self.trips.read().unwrap().values().cloned().collect();
        trips.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.number.cmp(&b.number)));
        Ok(trips)
    }

    async fn update_trip(&self, trip: Trip) -> Result<(), ReservationError> {
        let mut trips = self.trips.write().unwrap();
        if !trips.contains_key(&trip.id) {
            return Err(ReservationError::TripNotFound(trip.id));
        }
        if Self::number_taken(&trips, &trip.number, trip.id) {
            return Err(ReservationError::Validation(format!(
                "trip number already exists: {}",
                trip.number
            )));
        }
        trips.insert(trip.id, trip);
        Ok(())
    }

    async fn delete_trip(&self, trip_id: Uuid) -> Result<(), ReservationError> {
        let mut trips = self.trips.write().unwrap();
        if trips.remove(&trip_id).is_none() {
            return Err(ReservationError::TripNotFound(trip_id));
        }
        let mut seat_map = self.seats.write().unwrap();
        let mut trip_seats = self.trip_seats.write().unwrap();
        if let Some(seat_ids) = trip_seats.remove(&trip_id) {
            for seat_id in seat_ids {
                seat_map.remove(&seat_id);
            }
        }
        self.ledger.lock().unwrap().retain(|b| b.trip_id != trip_id);
        Ok(())
    }

    async fn get_seat(&self, seat_id: Uuid) -> Result<Option<Seat>, ReservationError> {
        let slot = {
            let seats = self.seats.read().unwrap();
            seats.get(&seat_id).cloned()
        };
        Ok(slot.map(|s| s.seat.lock().unwrap().clone()))
    }

    async fn list_seats(&self, trip_id: Uuid) -> Result<Vec<Seat>, ReservationError> {
        let seat_ids = self
            .trip_seats
            .read()
            .unwrap()
            .get(&trip_id)
            .cloned()
            .ok_or(ReservationError::TripNotFound(trip_id))?;

        let slots: Vec<Arc<SeatSlot>> = {
            let seats = self.seats.read().unwrap();
            seat_ids
                .iter()
                .filter_map(|id| seats.get(id).cloned())
                .collect()
        };
        Ok(slots.iter().map(|s| s.seat.lock().unwrap().clone()).collect())
    }

    async fn reserve_seat(
        &self,
        user_id: Uuid,
        seat_id: Uuid,
    ) -> Result<Booking, ReservationError> {
        // The map read lock stays held through the commit so a concurrent
        // delete_trip (write lock) either runs before the seat lookup or
        // after the booking is appended, never in between.
        let seats = self.seats.read().unwrap();
        let slot = seats
            .get(&seat_id)
            .ok_or(ReservationError::SeatNotFound(seat_id))?;

        // Per-seat critical section: check, flip, and append as one unit.
        let mut seat = slot.seat.lock().unwrap();
        if seat.is_booked() {
            return Err(ReservationError::AlreadyBooked(seat_id));
        }
        seat.status = SeatStatus::Booked;
        let booking = Booking::new(user_id, seat.trip_id, seat_id);
        self.ledger.lock().unwrap().push(booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, ReservationError> {
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == booking_id)
            .cloned())
    }

    async fn list_bookings_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, ReservationError> {
        let mut bookings: Vec<Booking> = self
            .ledger
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        // Appends happen in commit order; the stable sort keeps that order
        // for equal timestamps.
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use transita_core::TripSpec;

    fn spec(number: &str, seat_count: i32) -> TripSpec {
        let departure = Utc::now() + Duration::hours(1);
        TripSpec {
            name: "Night Express".to_string(),
            number: number.to_string(),
            origin: "Hyderabad".to_string(),
            destination: "Bengaluru".to_string(),
            features: Some("AC, WiFi".to_string()),
            departure_at: departure,
            arrival_at: departure + Duration::hours(8),
            seat_count,
            price_cents: 49900,
        }
    }

    async fn seed_trip(store: &MemoryStore, seat_count: i32) -> (Trip, Vec<Seat>) {
        let trip = Trip::new(spec("NX-101", seat_count));
        let seats: Vec<Seat> = (1..=seat_count)
            .map(|n| Seat::new(trip.id, format!("S{}", n)))
            .collect();
        store.create_trip(trip.clone(), seats.clone()).await.unwrap();
        (trip, seats)
    }

    #[tokio::test]
    async fn seats_come_back_in_provisioning_order() {
        let store = MemoryStore::new();
        let (trip, _) = seed_trip(&store, 5).await;

        let seats = store.list_seats(trip.id).await.unwrap();
        let labels: Vec<&str> = seats.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["S1", "S2", "S3", "S4", "S5"]);
        assert!(seats.iter().all(|s| s.status == SeatStatus::Available));
    }

    #[tokio::test]
    async fn duplicate_trip_number_is_rejected() {
        let store = MemoryStore::new();
        seed_trip(&store, 2).await;

        let trip = Trip::new(spec("NX-101", 2));
        let seats = vec![Seat::new(trip.id, "S1".to_string())];
        let err = store.create_trip(trip, seats).await.unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));
        assert_eq!(store.list_trips().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reserve_flips_seat_and_appends_booking() {
        let store = MemoryStore::new();
        let (trip, seats) = seed_trip(&store, 2).await;
        let user = Uuid::new_v4();

        let booking = store.reserve_seat(user, seats[0].id).await.unwrap();
        assert_eq!(booking.trip_id, trip.id);
        assert_eq!(booking.seat_id, seats[0].id);

        let seat = store.get_seat(seats[0].id).await.unwrap().unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
        assert_eq!(
            store.get_booking(booking.id).await.unwrap().unwrap().id,
            booking.id
        );
    }

    #[tokio::test]
    async fn rejected_reserve_leaves_no_trace() {
        let store = MemoryStore::new();
        let (_, seats) = seed_trip(&store, 1).await;
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();

        store.reserve_seat(winner, seats[0].id).await.unwrap();
        let err = store.reserve_seat(loser, seats[0].id).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyBooked(_)));

        assert_eq!(store.list_bookings_for_user(winner).await.unwrap().len(), 1);
        assert!(store.list_bookings_for_user(loser).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_seat_is_not_found_and_has_no_side_effects() {
        let store = MemoryStore::new();
        seed_trip(&store, 1).await;
        let user = Uuid::new_v4();

        let err = store.reserve_seat(user, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ReservationError::SeatNotFound(_)));
        assert!(store.list_bookings_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_reserves_yield_exactly_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let (_, seats) = seed_trip(&store, 1).await;
        let seat_id = seats[0].id;

        let users: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();
        let mut handles = Vec::new();
        for user in &users {
            let store = store.clone();
            let user = *user;
            handles.push(tokio::spawn(
                async move { store.reserve_seat(user, seat_id).await },
            ));
        }

        let mut wins = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(booking) => {
                    assert_eq!(booking.seat_id, seat_id);
                    wins += 1;
                }
                Err(ReservationError::AlreadyBooked(_)) => rejections += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(rejections, 15);

        // Exactly one ledger entry across all contenders.
        let mut total = 0;
        for user in &users {
            total += store.list_bookings_for_user(*user).await.unwrap().len();
        }
        assert_eq!(total, 1);

        let seat = store.get_seat(seat_id).await.unwrap().unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn contention_on_one_seat_does_not_block_another() {
        let store = Arc::new(MemoryStore::new());
        let (_, seats) = seed_trip(&store, 2).await;
        let first = seats[0].id;
        let second = seats[1].id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.reserve_seat(Uuid::new_v4(), first).await
            }));
        }
        let other = store.reserve_seat(Uuid::new_v4(), second).await;
        assert!(other.is_ok());

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn delete_trip_cascades_to_seats_and_bookings() {
        let store = MemoryStore::new();
        let (trip, seats) = seed_trip(&store, 2).await;
        let user = Uuid::new_v4();
        store.reserve_seat(user, seats[0].id).await.unwrap();

        store.delete_trip(trip.id).await.unwrap();

        assert!(store.get_trip(trip.id).await.unwrap().is_none());
        assert!(store.get_seat(seats[0].id).await.unwrap().is_none());
        assert!(store.list_bookings_for_user(user).await.unwrap().is_empty());
        assert!(matches!(
            store.list_seats(trip.id).await.unwrap_err(),
            ReservationError::TripNotFound(_)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reserve_racing_delete_never_strands_a_booking() {
        // A reserve in flight while the trip is deleted must either commit
        // before the cascade (and be purged with it) or fail SeatNotFound
        // after it; a booking for a vanished trip must never survive.
        for _ in 0..64 {
            let store = Arc::new(MemoryStore::new());
            let (trip, seats) = seed_trip(&store, 1).await;
            let seat_id = seats[0].id;
            let user = Uuid::new_v4();

            let reserver = {
                let store = store.clone();
                tokio::spawn(async move { store.reserve_seat(user, seat_id).await })
            };
            let deleter = {
                let store = store.clone();
                let trip_id = trip.id;
                tokio::spawn(async move { store.delete_trip(trip_id).await })
            };

            match reserver.await.unwrap() {
                Ok(_) | Err(ReservationError::SeatNotFound(_)) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
            deleter.await.unwrap().unwrap();

            assert!(store.get_trip(trip.id).await.unwrap().is_none());
            assert!(store.get_seat(seat_id).await.unwrap().is_none());
            assert!(store.list_bookings_for_user(user).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn bookings_list_in_creation_order() {
        let store = MemoryStore::new();
        let (_, seats) = seed_trip(&store, 3).await;
        let user = Uuid::new_v4();

        let first = store.reserve_seat(user, seats[0].id).await.unwrap();
        let second = store.reserve_seat(user, seats[1].id).await.unwrap();
        let third = store.reserve_seat(user, seats[2].id).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_bookings_for_user(user)
            .await
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, [first.id, second.id, third.id]);
    }
}
