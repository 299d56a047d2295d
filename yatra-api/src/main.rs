use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatra_api::{app, metrics::Metrics, scheduler, AppState, Stores};
use yatra_core::{InMemoryStore, LogNotifier, MockPaymentGateway, Notifier};
use yatra_store::{Config, DbClient, EventProducer, PgBookingRepository, PgTripRepository, RedisClient, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatra_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Yatra API on port {}", config.server.port);

    let mut db = None;
    let stores = match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; bookings are lost on restart");
            let store = Arc::new(InMemoryStore::new());
            Stores {
                trips: store.clone(),
                bookings: store.clone(),
                payments: store,
            }
        }
        StorageBackend::Postgres => {
            let client = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            client.migrate().await.context("Failed to run migrations")?;

            let bookings = Arc::new(PgBookingRepository::new(client.pool.clone()));
            let stores = Stores {
                trips: Arc::new(PgTripRepository::new(client.pool.clone())),
                bookings: bookings.clone(),
                payments: bookings,
            };
            db = Some(Arc::new(client));
            stores
        }
    };

    let notifier: Arc<dyn Notifier> = if config.kafka.enabled {
        Arc::new(EventProducer::new(&config.kafka.brokers).context("Failed to create Kafka producer")?)
    } else {
        tracing::info!("Kafka disabled, events go to the log");
        Arc::new(LogNotifier)
    };

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let mut state = AppState::build(&config, stores, Arc::new(MockPaymentGateway), notifier, metrics);

    if let Some(db) = db {
        state = state.with_db(db);
    }
    if let Some(url) = &config.redis.url {
        let redis = RedisClient::new(url).await.context("Invalid Redis URL")?;
        state = state.with_redis(Arc::new(redis));
    }

    if config.scheduler.enabled {
        scheduler::spawn(&state, &config.scheduler);
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
