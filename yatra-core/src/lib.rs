pub mod booking;
pub mod repository;
pub mod payment;
pub mod notify;
pub mod memory;
pub mod maintenance;

pub use booking::{
    Booking, BookingDraft, BookingStatus, Gender, Passenger, PaymentKind, PaymentRecord,
    PaymentRecordStatus, PaymentStatus,
};
pub use maintenance::MaintenanceLock;
pub use memory::InMemoryStore;
pub use notify::{LogNotifier, MemoryNotifier, Notifier};
pub use payment::{GatewayAck, MockPaymentGateway, PaymentGateway, PaymentInstruction};
pub use repository::{
    BookingFilter, BookingRepository, ClearSummary, PaymentFilter, PaymentRepository, StoreError,
    StoreResult, TripFilter, TripRepository, UpsertOutcome,
};
