use serde::Deserialize;
use std::env;
use yatra_booking::EngineConfig;
use yatra_catalog::PricingConfig;
use yatra_schedule::GeneratorConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub booking: EngineConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store, lost on restart
    Memory,
    #[default]
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub backend: StorageBackend,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

fn default_rate_limit() -> i64 {
    120
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KafkaConfig {
    #[serde(default)]
    pub brokers: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between automatic trip regenerations
    pub regenerate_every_secs: u64,
    /// Confirmed bookings departing within this many hours get a reminder
    pub reminder_window_hours: i64,
    pub reminder_tick_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            regenerate_every_secs: 7 * 24 * 3600,
            reminder_window_hours: 48,
            reminder_tick_secs: 3600,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `YATRA_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("YATRA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_fills_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [database]
            backend = "memory"

            [auth]
            jwt_secret = "secret"
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.booking.max_attempts, 3);
        assert_eq!(config.generator.weeks_ahead, 12);
        assert_eq!(config.generator.tours.len(), 4);
        assert_eq!(config.scheduler.reminder_window_hours, 48);
        assert!(config.redis.url.is_none());
        assert!(!config.kafka.enabled);
    }
}
