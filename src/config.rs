use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Application configuration, layered from `config/default.toml` and
/// `APP_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub environment: String,

    pub log_level: String,
    pub log_json: bool,

    pub auto_migrate: bool,

    /// How long a checkout idempotency key replays its stored response.
    pub idempotency_ttl_secs: u64,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    let cfg = Config::builder()
        .set_default("database_url", "sqlite::memory:")?
        .set_default("host", "127.0.0.1")?
        .set_default("port", 8080_i64)?
        .set_default("environment", "development")?
        .set_default("log_level", "info")?
        .set_default("log_json", false)?
        .set_default("auto_migrate", true)?
        .set_default("idempotency_ttl_secs", 86_400_i64)?
        .set_default("db_max_connections", 10_i64)?
        .set_default("db_min_connections", 1_i64)?
        .set_default("db_connect_timeout_secs", 30_i64)?
        .set_default("db_acquire_timeout_secs", 8_i64)?
        .set_default("db_idle_timeout_secs", 600_i64)?
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("APP"))
        .build()?;

    cfg.try_deserialize()
}

/// Initializes the global tracing subscriber. `RUST_LOG` wins over the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
