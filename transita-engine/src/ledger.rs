use std::sync::Arc;

use uuid::Uuid;

use transita_core::{Booking, BookingView, ReservationError, ReservationStore};

/// Read side of the append-only booking ledger. Entries are written only by
/// the reservation commit; this type exposes owner-scoped queries and joins
/// each booking to the current trip state, so price corrections show through
/// to existing bookings.
pub struct BookingLedger {
    store: Arc<dyn ReservationStore>,
}

impl BookingLedger {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    pub async fn get_booking(
        &self,
        caller: Uuid,
        booking_id: Uuid,
    ) -> Result<BookingView, ReservationError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(ReservationError::BookingNotFound(booking_id))?;
        if booking.user_id != caller {
            return Err(ReservationError::Unauthorized(
                "booking belongs to another user".to_string(),
            ));
        }
        self.resolve(&booking).await
    }

    /// Bookings of one user, creation time ascending. Callers may only list
    /// their own bookings.
    pub async fn list_bookings_for_user(
        &self,
        caller: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<BookingView>, ReservationError> {
        if caller != user_id {
            return Err(ReservationError::Unauthorized(
                "cannot list another user's bookings".to_string(),
            ));
        }
        let bookings = self.store.list_bookings_for_user(user_id).await?;
        let mut views = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            views.push(self.resolve(booking).await?);
        }
        Ok(views)
    }

    async fn resolve(&self, booking: &Booking) -> Result<BookingView, ReservationError> {
        let trip = self
            .store
            .get_trip(booking.trip_id)
            .await?
            .ok_or(ReservationError::TripNotFound(booking.trip_id))?;
        let seat = self
            .store
            .get_seat(booking.seat_id)
            .await?
            .ok_or(ReservationError::SeatNotFound(booking.seat_id))?;
        Ok(BookingView::resolve(booking, &trip, &seat))
    }
}
