//! Configuration loading for the LoRaWatch pipeline.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `LORAWATCH_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application configuration derived from `LORAWATCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Optional newline-delimited JSON event stream to consume (dev/ops
    /// transport); the broker binding proper lives outside this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_stream_path: Option<String>,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// Telemetry decoder configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DecoderConfig {
    /// Bounded worker pool size for envelope decoding (default: 8)
    ///
    /// Environment variable: `LORAWATCH_DECODER_WORKER_POOL_SIZE`
    #[serde(default = "default_decoder_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Number of physical replicas each end device transmits per uplink
    /// (default: 3)
    ///
    /// Environment variable: `LORAWATCH_DECODER_TX_REPLICAS`
    #[serde(default = "default_decoder_tx_replicas")]
    pub tx_replicas: u32,
}

/// KPI aggregation scheduler configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AggregationConfig {
    /// Aggregation window size in minutes (default: 60)
    ///
    /// Environment variable: `LORAWATCH_AGGREGATION_WINDOW_MINUTES`
    #[serde(default = "default_aggregation_window_minutes")]
    pub window_minutes: u64,

    /// Seconds between scheduler ticks while advancing (default: 60)
    ///
    /// Environment variable: `LORAWATCH_AGGREGATION_TICK_SECONDS`
    #[serde(default = "default_aggregation_tick_seconds")]
    pub tick_seconds: u64,

    /// Seconds between polls while waiting for the first telemetry row
    /// (default: 60)
    ///
    /// Environment variable: `LORAWATCH_AGGREGATION_BOOTSTRAP_POLL_SECONDS`
    #[serde(default = "default_aggregation_bootstrap_poll_seconds")]
    pub bootstrap_poll_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            event_stream_path: None,
            decoder: DecoderConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_decoder_worker_pool_size(),
            tx_replicas: default_decoder_tx_replicas(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_aggregation_window_minutes(),
            tick_seconds: default_aggregation_tick_seconds(),
            bootstrap_poll_seconds: default_aggregation_bootstrap_poll_seconds(),
        }
    }
}

impl AppConfig {
    /// Validates the configuration, returning an error if a setting is out of
    /// bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.decoder.worker_pool_size == 0 {
            return Err(ConfigError::InvalidWorkerPoolSize {
                value: self.decoder.worker_pool_size,
            });
        }
        if self.decoder.tx_replicas == 0 {
            return Err(ConfigError::InvalidTxReplicas {
                value: self.decoder.tx_replicas,
            });
        }
        if self.aggregation.window_minutes == 0 {
            return Err(ConfigError::InvalidWindowMinutes {
                value: self.aggregation.window_minutes,
            });
        }
        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite::memory:".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_decoder_worker_pool_size() -> usize {
    8
}

fn default_decoder_tx_replicas() -> u32 {
    3
}

fn default_aggregation_window_minutes() -> u64 {
    60
}

fn default_aggregation_tick_seconds() -> u64 {
    60
}

fn default_aggregation_bootstrap_poll_seconds() -> u64 {
    60
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LORAWATCH_DATABASE_URL must not be empty")]
    MissingDatabaseUrl,
    #[error("decoder worker pool size must be positive (got {value})")]
    InvalidWorkerPoolSize { value: usize },
    #[error("tx replica count must be positive (got {value})")]
    InvalidTxReplicas { value: u32 },
    #[error("aggregation window must be positive (got {value} minutes)")]
    InvalidWindowMinutes { value: u64 },
    #[error("failed to parse {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("failed to read env file {path}: {source}")]
    DotenvRead {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Loads [`AppConfig`] from layered dotenv files plus process environment.
///
/// Load order (later wins): `.env`, `.env.local`, `.env.<profile>`,
/// `.env.<profile>.local`, then real environment variables.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }

    #[allow(dead_code)]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut values = BTreeMap::new();
        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("LORAWATCH_PROFILE")
            .ok()
            .or_else(|| values.get("LORAWATCH_PROFILE").cloned())
            .unwrap_or_else(default_profile);
        self.merge_dotenv(self.base_dir.join(format!(".env.{profile}")), &mut values)?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{profile}.local")),
            &mut values,
        )?;

        for (key, value) in env::vars() {
            if key.starts_with("LORAWATCH_") {
                values.insert(key, value);
            }
        }

        let config = Self::from_values(&values)?;
        config.validate()?;
        Ok(config)
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) =
                        item.map_err(|source| ConfigError::DotenvRead {
                            path: path.clone(),
                            source,
                        })?;
                    if key.starts_with("LORAWATCH_") {
                        values.insert(key, value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(source) => Err(ConfigError::DotenvRead { path, source }),
        }
    }

    /// Maps flat `LORAWATCH_*` keys onto the nested config structure and
    /// deserializes through serde so field defaults apply uniformly.
    fn from_values(values: &BTreeMap<String, String>) -> Result<AppConfig, ConfigError> {
        use serde_json::{Map, Value};

        let mut root = Map::new();
        let mut decoder = Map::new();
        let mut aggregation = Map::new();

        for (key, raw) in values {
            let Some(rest) = key.strip_prefix("LORAWATCH_") else {
                continue;
            };
            let parse = |raw: &str| -> Value {
                // Numbers pass through typed, everything else stays a string
                raw.parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(raw.to_string()))
            };
            if let Some(field) = rest.strip_prefix("DECODER_") {
                decoder.insert(field.to_string(), parse(raw));
            } else if let Some(field) = rest.strip_prefix("AGGREGATION_") {
                aggregation.insert(field.to_string(), parse(raw));
            } else {
                root.insert(rest.to_string(), parse(raw));
            }
        }

        if !decoder.is_empty() {
            root.insert("DECODER".to_string(), Value::Object(decoder));
        }
        if !aggregation.is_empty() {
            root.insert("AGGREGATION".to_string(), Value::Object(aggregation));
        }

        serde_json::from_value(Value::Object(root)).map_err(|err| ConfigError::InvalidValue {
            key: "LORAWATCH_*".to_string(),
            message: err.to_string(),
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.decoder.tx_replicas, 3);
        assert_eq!(config.aggregation.window_minutes, 60);
    }

    #[test]
    fn rejects_zero_window() {
        let mut config = AppConfig::default();
        config.aggregation.window_minutes = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindowMinutes { value: 0 })
        ));
    }

    #[test]
    fn rejects_empty_database_url() {
        let mut config = AppConfig::default();
        config.database_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }

    #[test]
    fn maps_flat_keys_onto_nested_sections() {
        let mut values = BTreeMap::new();
        values.insert(
            "LORAWATCH_DATABASE_URL".to_string(),
            "postgres://kpi".to_string(),
        );
        values.insert("LORAWATCH_DECODER_TX_REPLICAS".to_string(), "5".to_string());
        values.insert(
            "LORAWATCH_AGGREGATION_WINDOW_MINUTES".to_string(),
            "15".to_string(),
        );

        let config = ConfigLoader::from_values(&values).expect("config parses");
        assert_eq!(config.database_url, "postgres://kpi");
        assert_eq!(config.decoder.tx_replicas, 5);
        assert_eq!(config.aggregation.window_minutes, 15);
        // untouched sections keep their defaults
        assert_eq!(config.decoder.worker_pool_size, 8);
        assert_eq!(config.aggregation.tick_seconds, 60);
    }
}
