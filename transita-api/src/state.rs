use std::sync::Arc;

use transita_core::ReservationStore;
use transita_engine::{BookingLedger, ReservationEngine, SeatInventory};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub inventory: Arc<SeatInventory>,
    pub engine: Arc<ReservationEngine>,
    pub ledger: Arc<BookingLedger>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>, auth: AuthConfig) -> Self {
        Self {
            inventory: Arc::new(SeatInventory::new(store.clone())),
            engine: Arc::new(ReservationEngine::new(store.clone())),
            ledger: Arc::new(BookingLedger::new(store)),
            auth,
        }
    }
}
