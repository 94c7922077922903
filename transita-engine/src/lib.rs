pub mod inventory;
pub mod ledger;
pub mod reservation;

pub use inventory::SeatInventory;
pub use ledger::BookingLedger;
pub use reservation::ReservationEngine;
