use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter: true while `key` has been hit at most `limit`
    /// times in the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: u64, window_seconds: i64) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

pub fn rate_limit_key(client: &str, window_start: i64) -> String {
    format!("ratelimit:{}:{}", client, window_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_changes_per_window() {
        assert_eq!(rate_limit_key("10.0.0.1", 29_000_000), "ratelimit:10.0.0.1:29000000");
        assert_ne!(rate_limit_key("10.0.0.1", 1), rate_limit_key("10.0.0.1", 2));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisClient::new("not a url").is_err());
    }
}
