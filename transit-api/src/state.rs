use chrono::Duration;
use std::sync::Arc;
use tokio::sync::broadcast;
use transit_booking::{BookingRules, BookingServices, BroadcastPublisher, EventFanout};
use transit_core::repository::BookingStore;
use transit_core::Clock;
use transit_shared::models::events::SeatEvent;
use transit_store::app_config::BusinessRules;
use transit_store::{DbClient, RedisClient};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub services: BookingServices,
    /// Set when running on Postgres; used by the health check.
    pub db: Option<Arc<DbClient>>,
    /// Rate limiting is off without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub sse_tx: broadcast::Sender<SeatEvent>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Wires the booking services to `store`. Seat events go to `events`
    /// and to the live stream channel.
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: Arc<dyn Clock>,
        events: EventFanout,
        auth: AuthConfig,
        business_rules: BusinessRules,
    ) -> prometheus::Result<Self> {
        let (sse_tx, _) = broadcast::channel(256);
        let metrics = Arc::new(Metrics::new()?);
        let events = events
            .with_sink(Arc::new(BroadcastPublisher::new(sse_tx.clone())))
            .with_sink(metrics.clone());

        let rules = BookingRules {
            hold: Duration::seconds(business_rules.reservation_hold_seconds as i64),
            currency: business_rules.currency.clone(),
        };

        Ok(Self {
            services: BookingServices::new(store, clock, events, rules),
            db: None,
            redis: None,
            sse_tx,
            auth,
            business_rules,
            metrics,
        })
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
