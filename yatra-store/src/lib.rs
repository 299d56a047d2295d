pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod redis_repo;
pub mod trip_repo;

pub use app_config::{Config, StorageBackend};
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use redis_repo::RedisClient;
pub use trip_repo::PgTripRepository;
