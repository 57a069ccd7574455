use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transit_api::{
    app,
    state::{AppState, AuthConfig},
    worker::start_expiry_worker,
};
use transit_booking::{EventFanout, InMemoryBookingStore};
use transit_core::repository::{BookingStore, SeatEventPublisher};
use transit_core::SystemClock;
use transit_store::{Config, DbClient, LoggingPublisher, PostgresBookingStore, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Transit API on port {}", config.server.port);

    let mut business_rules = config.business_rules.clone();

    // Storage
    let (store, db): (Arc<dyn BookingStore>, Option<Arc<DbClient>>) = match &config.database.url {
        Some(url) => {
            let db = DbClient::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            business_rules = db
                .fetch_business_rules(business_rules)
                .await
                .context("Failed to load business rules")?;
            let store = PostgresBookingStore::new(db.pool.clone());
            (Arc::new(store), Some(Arc::new(db)))
        }
        None => {
            tracing::warn!("No database configured, bookings are kept in memory and lost on restart");
            (Arc::new(InMemoryBookingStore::new()), None)
        }
    };

    // Redis Connection
    let redis = match &config.redis.url {
        Some(url) => Some(Arc::new(RedisClient::new(url).context("Failed to create Redis client")?)),
        None => {
            tracing::info!("No Redis configured, rate limiting disabled");
            None
        }
    };

    let events = EventFanout::new().with_sink(event_sink(&config)?);

    let mut state = AppState::new(
        store,
        Arc::new(SystemClock),
        events,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
        business_rules.clone(),
    )
    .context("Failed to register metrics")?;
    if let Some(db) = db {
        state = state.with_db(db);
    }
    if let Some(redis) = redis {
        state = state.with_redis(redis);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(start_expiry_worker(
        state.clone(),
        Duration::from_secs(business_rules.expiry_sweep_interval_seconds.max(1)),
        shutdown_rx,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    worker.await.context("Expiry worker panicked")?;
    Ok(())
}

#[cfg(feature = "kafka")]
fn event_sink(config: &Config) -> anyhow::Result<Arc<dyn SeatEventPublisher>> {
    match &config.kafka.brokers {
        Some(brokers) => {
            let producer = transit_store::EventProducer::new(brokers).context("Failed to create Kafka producer")?;
            Ok(Arc::new(producer))
        }
        None => Ok(Arc::new(LoggingPublisher)),
    }
}

#[cfg(not(feature = "kafka"))]
fn event_sink(config: &Config) -> anyhow::Result<Arc<dyn SeatEventPublisher>> {
    if config.kafka.brokers.is_some() {
        tracing::warn!("Kafka brokers configured but the kafka feature is disabled, logging events instead");
    }
    Ok(Arc::new(LoggingPublisher))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
