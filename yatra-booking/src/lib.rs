pub mod error;
pub mod engine;
pub mod inventory;
pub mod ledger;
pub mod reports;

pub use engine::{BookingEngine, CreateBooking, EngineConfig};
pub use error::BookingError;
pub use inventory::TripInventory;
pub use ledger::PaymentLedger;
pub use reports::{ReportService, RevenueSummary, TripOccupancy};
