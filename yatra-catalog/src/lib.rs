pub mod trip;
pub mod calendar;
pub mod pricing;

pub use trip::{BoardingPoint, InventoryError, Trip, TripDetails, TripDraft, TripStatus};
pub use calendar::{upcoming_weekends, CalendarEntry, Holiday, HOLIDAYS};
pub use pricing::{PricingConfig, PricingPolicy, Quote, TourFare};
