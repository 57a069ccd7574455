pub mod app_config;
pub mod database;
pub mod error;
pub mod events;
pub mod postgres_store;
pub mod redis_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use error::StoreError;
pub use events::LoggingPublisher;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use postgres_store::PostgresBookingStore;
pub use redis_repo::RedisClient;
