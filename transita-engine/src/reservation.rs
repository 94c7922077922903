use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use transita_core::{BookingView, ReservationError, ReservationStore};

/// The atomic check-and-commit core.
///
/// The seat-status check, the Available -> Booked flip, and the ledger
/// append are delegated to `ReservationStore::reserve_seat`, which performs
/// them as one unit with exclusivity scoped to the target seat. Under
/// concurrent calls against the same seat exactly one succeeds; the rest get
/// `AlreadyBooked` with no side effects. Which caller wins is arbitrary.
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub async fn reserve(
        &self,
        user_id: Uuid,
        seat_id: Uuid,
    ) -> Result<BookingView, ReservationError> {
        let booking = match self.store.reserve_seat(user_id, seat_id).await {
            Ok(booking) => booking,
            Err(err) => {
                match &err {
                    ReservationError::AlreadyBooked(_) => {
                        info!(%seat_id, %user_id, "reserve rejected: seat taken");
                    }
                    ReservationError::SeatNotFound(_) => {
                        info!(%seat_id, "reserve rejected: unknown seat");
                    }
                    other => error!(%seat_id, error = %other, "reserve failed"),
                }
                return Err(err);
            }
        };
        info!(booking_id = %booking.id, %seat_id, %user_id, "seat booked");

        let trip = self
            .store
            .get_trip(booking.trip_id)
            .await?
            .ok_or(ReservationError::TripNotFound(booking.trip_id))?;
        let seat = self
            .store
            .get_seat(seat_id)
            .await?
            .ok_or(ReservationError::SeatNotFound(seat_id))?;
        Ok(BookingView::resolve(&booking, &trip, &seat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use transita_core::{SeatStatus, TripSpec};
    use transita_store::MemoryStore;

    use crate::inventory::SeatInventory;
    use crate::ledger::BookingLedger;

    fn spec(seat_count: i32) -> TripSpec {
        let departure = Utc::now() + Duration::hours(1);
        TripSpec {
            name: "Night Express".to_string(),
            number: "NX-101".to_string(),
            origin: "Hyderabad".to_string(),
            destination: "Bengaluru".to_string(),
            features: None,
            departure_at: departure,
            arrival_at: departure + Duration::hours(8),
            seat_count,
            price_cents: 49900,
        }
    }

    fn service() -> (SeatInventory, ReservationEngine, BookingLedger) {
        let store: Arc<dyn ReservationStore> = Arc::new(MemoryStore::new());
        (
            SeatInventory::new(store.clone()),
            ReservationEngine::new(store.clone()),
            BookingLedger::new(store),
        )
    }

    #[tokio::test]
    async fn reserve_returns_a_resolved_view() {
        let (inventory, engine, _) = service();
        let trip = inventory.create_trip(spec(2)).await.unwrap();
        let seats = inventory.list_seats(trip.id).await.unwrap();
        let user = Uuid::new_v4();

        let view = engine.reserve(user, seats[0].id).await.unwrap();
        assert_eq!(view.user_id, user);
        assert_eq!(view.trip_id, trip.id);
        assert_eq!(view.seat_label, "S1");
        assert_eq!(view.origin, "Hyderabad");
        assert_eq!(view.destination, "Bengaluru");
        assert_eq!(view.price_cents, 49900);

        let seat = inventory.get_seat(seats[0].id).await.unwrap();
        assert_eq!(seat.status, SeatStatus::Booked);
    }

    #[tokio::test]
    async fn second_reserve_on_the_same_seat_is_rejected_without_side_effects() {
        let (inventory, engine, ledger) = service();
        let trip = inventory.create_trip(spec(1)).await.unwrap();
        let seats = inventory.list_seats(trip.id).await.unwrap();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        engine.reserve(first, seats[0].id).await.unwrap();
        let err = engine.reserve(second, seats[0].id).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyBooked(_)));

        assert_eq!(
            ledger.list_bookings_for_user(first, first).await.unwrap().len(),
            1
        );
        assert!(ledger
            .list_bookings_for_user(second, second)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_seat_is_rejected() {
        let (_, engine, _) = service();
        let err = engine.reserve(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ReservationError::SeatNotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_reserves_on_one_seat_take_exactly_one_winner() {
        let store: Arc<dyn ReservationStore> = Arc::new(MemoryStore::new());
        let inventory = SeatInventory::new(store.clone());
        let engine = Arc::new(ReservationEngine::new(store.clone()));
        let ledger = BookingLedger::new(store);

        let trip = inventory.create_trip(spec(1)).await.unwrap();
        let seats = inventory.list_seats(trip.id).await.unwrap();
        let seat_id = seats[0].id;

        let users: Vec<Uuid> = (0..12).map(|_| Uuid::new_v4()).collect();
        let mut handles = Vec::new();
        for user in &users {
            let engine = engine.clone();
            let user = *user;
            handles.push(tokio::spawn(async move { engine.reserve(user, seat_id).await }));
        }

        let mut wins = 0;
        let mut rejections = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(view) => {
                    assert_eq!(view.seat_id, seat_id);
                    wins += 1;
                }
                Err(ReservationError::AlreadyBooked(_)) => rejections += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(rejections, 11);

        let mut total = 0;
        for user in &users {
            total += ledger.list_bookings_for_user(*user, *user).await.unwrap().len();
        }
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn two_users_two_seats_end_to_end() {
        let (inventory, engine, ledger) = service();
        let trip = inventory.create_trip(spec(2)).await.unwrap();
        let seats = inventory.list_seats(trip.id).await.unwrap();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        let booked_a = engine.reserve(user_a, seats[0].id).await.unwrap();
        assert_eq!(booked_a.seat_label, "S1");

        let err = engine.reserve(user_b, seats[0].id).await.unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyBooked(_)));

        let booked_b = engine.reserve(user_b, seats[1].id).await.unwrap();
        assert_eq!(booked_b.seat_label, "S2");

        let a_bookings = ledger.list_bookings_for_user(user_a, user_a).await.unwrap();
        let b_bookings = ledger.list_bookings_for_user(user_b, user_b).await.unwrap();
        assert_eq!(a_bookings.len(), 1);
        assert_eq!(b_bookings.len(), 1);
        assert_eq!(a_bookings[0].id, booked_a.id);
        assert_eq!(b_bookings[0].id, booked_b.id);
    }
}
