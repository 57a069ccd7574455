use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BusinessRules {
    #[serde(default = "default_hold_seconds")]
    pub reservation_hold_seconds: u64,
    #[serde(default = "default_sweep_seconds")]
    pub expiry_sweep_interval_seconds: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Requests per client IP per minute; 0 disables the limiter.
    #[serde(default)]
    pub rate_limit_per_minute: u64,
}

fn default_hold_seconds() -> u64 { 900 }
fn default_sweep_seconds() -> u64 { 30 }
fn default_currency() -> String { "LKR".to_string() }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            reservation_hold_seconds: default_hold_seconds(),
            expiry_sweep_interval_seconds: default_sweep_seconds(),
            currency: default_currency(),
            rate_limit_per_minute: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Without a URL the service runs on the in-memory store.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // TRANSIT__DATABASE__URL=postgres://... sets database.url
            .add_source(config::Environment::with_prefix("TRANSIT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
