pub mod tours;
pub mod generator;

pub use generator::{GenerationSummary, GeneratorConfig, GeneratorError, TripGenerator};
pub use tours::{default_tours, TourDefinition};
