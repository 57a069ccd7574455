use thiserror::Error;
use transit_core::BookingError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("unreadable {table} row: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Booking store failure: {}", err);
        BookingError::SourceUnavailable(err.to_string())
    }
}

/// `map_err` adapter for sqlx calls inside `BookingStore` methods.
pub(crate) fn db(err: sqlx::Error) -> BookingError {
    StoreError::Database(err).into()
}
