use std::sync::Arc;
use yatra_booking::{BookingEngine, PaymentLedger, ReportService, TripInventory};
use yatra_catalog::PricingPolicy;
use yatra_core::{
    BookingRepository, MaintenanceLock, Notifier, PaymentGateway, PaymentRepository, TripRepository,
};
use yatra_schedule::TripGenerator;
use yatra_store::{Config, DbClient, RedisClient};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage seams shared by every service
#[derive(Clone)]
pub struct Stores {
    pub trips: Arc<dyn TripRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub inventory: Arc<TripInventory>,
    pub ledger: Arc<PaymentLedger>,
    pub reports: Arc<ReportService>,
    pub generator: Arc<TripGenerator>,
    pub notifier: Arc<dyn Notifier>,
    pub db: Option<Arc<DbClient>>,
    pub redis: Option<Arc<RedisClient>>,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
}

impl AppState {
    /// Wire the booking services over one set of stores. All services share
    /// a single maintenance lock.
    pub fn build(
        config: &Config,
        stores: Stores,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let maintenance = Arc::new(MaintenanceLock::new());

        let engine = BookingEngine::new(
            stores.trips.clone(),
            stores.bookings.clone(),
            stores.payments.clone(),
            gateway.clone(),
            notifier.clone(),
            maintenance.clone(),
        )
        .with_config(config.booking.clone());

        let inventory = TripInventory::new(stores.trips.clone(), maintenance.clone());
        let ledger = PaymentLedger::new(
            stores.bookings.clone(),
            stores.payments.clone(),
            gateway,
            notifier.clone(),
        );
        let reports = ReportService::new(stores.trips.clone(), stores.bookings.clone(), stores.payments.clone());
        let generator = TripGenerator::new(
            stores.trips,
            PricingPolicy::new(config.pricing.clone()),
            config.generator.clone(),
            maintenance,
        );

        Self {
            engine: Arc::new(engine),
            inventory: Arc::new(inventory),
            ledger: Arc::new(ledger),
            reports: Arc::new(reports),
            generator: Arc::new(generator),
            notifier,
            db: None,
            redis: None,
            metrics,
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
            },
            rate_limit_per_minute: config.redis.rate_limit_per_minute,
        }
    }

    pub fn with_db(mut self, db: Arc<DbClient>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_redis(mut self, redis: Arc<RedisClient>) -> Self {
        self.redis = Some(redis);
        self
    }
}
