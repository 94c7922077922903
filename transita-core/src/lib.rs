pub mod error;
pub mod models;
pub mod repository;

pub use error::ReservationError;
pub use models::{Booking, BookingView, Seat, SeatStatus, Trip, TripSpec, TripUpdate};
pub use repository::ReservationStore;
