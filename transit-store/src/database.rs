use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

use crate::app_config::BusinessRules;
use crate::error::StoreError;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Overlays operator-edited rows of the `business_rules` table on the
    /// file/env configuration. Rows look like `{"value": 600}`.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, StoreError> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_overrides(defaults, rows))
    }
}

fn apply_rule_overrides(mut rules: BusinessRules, rows: Vec<(String, Value)>) -> BusinessRules {
    for (key, value) in rows {
        let v = value.get("value");
        let applied = match (key.as_str(), v) {
            ("reservation_hold_seconds", Some(v)) => v
                .as_u64()
                .filter(|s| *s > 0)
                .map(|secs| rules.reservation_hold_seconds = secs)
                .is_some(),
            ("expiry_sweep_interval_seconds", Some(v)) => v
                .as_u64()
                .filter(|s| *s > 0)
                .map(|secs| rules.expiry_sweep_interval_seconds = secs)
                .is_some(),
            ("rate_limit_per_minute", Some(v)) => v
                .as_u64()
                .map(|limit| rules.rate_limit_per_minute = limit)
                .is_some(),
            ("currency", Some(v)) => v
                .as_str()
                .map(|code| rules.currency = code.to_string())
                .is_some(),
            _ => false,
        };

        if applied {
            info!("Business rule {} overridden from database", key);
        } else {
            warn!("Ignoring business rule {} with value {}", key, value);
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_overrides() {
        let rows = vec![
            ("reservation_hold_seconds".to_string(), json!({"value": 600})),
            ("expiry_sweep_interval_seconds".to_string(), json!({"value": 0})),
            ("currency".to_string(), json!({"value": "USD"})),
            ("unknown".to_string(), json!({"value": true})),
            ("rate_limit_per_minute".to_string(), json!(120)),
        ];

        let rules = apply_rule_overrides(BusinessRules::default(), rows);
        assert_eq!(rules.reservation_hold_seconds, 600);
        assert_eq!(rules.expiry_sweep_interval_seconds, 30);
        assert_eq!(rules.currency, "USD");
        assert_eq!(rules.rate_limit_per_minute, 0);
    }
}
