//! Hierarchical configuration loading shared by all four worker binaries:
//! programmatic defaults, an optional project YAML file, then environment
//! variables (highest precedence).

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("invalid port: {0}")]
    InvalidPort(u16),

    #[error("invalid log level '{0}', must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("tick interval must be positive, got {0}ms")]
    NonPositiveTick(u64),
}

/// Loads `T` from programmatic defaults, merged with `<yaml_path>` if it
/// exists, merged with `<env_prefix>`-prefixed environment variables
/// (double-underscore `__` splits nested fields, e.g.
/// `REMINDER_ENGINE_HTTP__PORT`).
pub fn load<T>(env_prefix: &str, yaml_path: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Serialize + Default,
{
    let config: T = Figment::new()
        .merge(Serialized::defaults(T::default()))
        .merge(Yaml::file(yaml_path))
        .merge(Env::prefixed(env_prefix).split("__"))
        .extract()?;
    Ok(config)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "sqlite://worker.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Broker addressing. `dapr_http_port: None` means "run degraded with a
/// no-op broker" -- a valid, documented startup mode.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BrokerConfig {
    pub dapr_http_port: Option<u16>,
    pub pubsub_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

pub fn validate_common(
    http: &HttpConfig,
    database: &DatabaseConfig,
    logging: &LoggingConfig,
) -> Result<(), ConfigError> {
    if http.port == 0 {
        return Err(ConfigError::InvalidPort(http.port));
    }
    if database.path.is_empty() {
        return Err(ConfigError::EmptyDatabasePath);
    }
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&logging.level.as_str()) {
        return Err(ConfigError::InvalidLogLevel(logging.level.clone()));
    }
    Ok(())
}

pub fn validate_tick_ms(tick_ms: u64) -> Result<(), ConfigError> {
    if tick_ms == 0 {
        return Err(ConfigError::NonPositiveTick(tick_ms));
    }
    Ok(())
}
