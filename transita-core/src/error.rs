use uuid::Uuid;

/// Error taxonomy for the reservation service.
///
/// `AlreadyBooked` is a normal rejection, not a fault: callers may retry a
/// different seat but retrying the same seat will keep failing. Every variant
/// is scoped to the single request; none is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("seat not found: {0}")]
    SeatNotFound(Uuid),

    #[error("booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("seat already booked: {0}")]
    AlreadyBooked(Uuid),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("storage error: {0}")]
    Storage(String),
}
