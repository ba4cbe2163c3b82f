//! Process configuration, read from environment variables.
//!
//! Every setting has a default except `DATABASE_URL`, which is only required
//! when persistent stores are enabled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use fairmart_observability::LogFormat;

use crate::retry::RetryPolicy;

/// Secret used when `JWT_SECRET` is unset. Only suitable for local runs.
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES is enabled")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub lock_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was absent and [`DEV_JWT_SECRET`] is in use.
    pub jwt_secret_is_default: bool,
    pub log_format: LogFormat,
    /// `Some` selects the Postgres store; `None` the in-memory one.
    pub database: Option<DatabaseConfig>,
    pub order_number_attempts: u32,
    pub estimated_delivery_days: u32,
    pub retry: RetryPolicy,
    pub seed_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_secret_is_default: true,
            log_format: LogFormat::Json,
            database: None,
            order_number_attempts: 20,
            estimated_delivery_days: fairmart_orders::DEFAULT_DELIVERY_DAYS,
            retry: RetryPolicy::exponential(3, Duration::from_millis(25), Duration::from_secs(1)),
            seed_path: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_map(map: &HashMap<&str, &str>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = AppConfig::default();

        let (jwt_secret, jwt_secret_is_default) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (defaults.jwt_secret.clone(), true),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: raw,
            })?,
            None => defaults.log_format,
        };

        let database = if parse_or(&get, "USE_PERSISTENT_STORES", false, parse_bool)? {
            let url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            Some(DatabaseConfig {
                url,
                max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10, parse_num)?,
                lock_timeout: Duration::from_millis(parse_or(&get, "DB_LOCK_TIMEOUT_MS", 2_000, parse_num)?),
            })
        } else {
            None
        };

        let retry = RetryPolicy::exponential(
            parse_or(&get, "TX_RETRY_MAX_ATTEMPTS", defaults.retry.max_attempts, parse_num)?,
            Duration::from_millis(parse_or(&get, "TX_RETRY_BASE_DELAY_MS", 25, parse_num)?),
            defaults.retry.max_delay,
        );

        let order_number_attempts =
            parse_or(&get, "ORDER_NUMBER_MAX_ATTEMPTS", defaults.order_number_attempts, parse_num)?;
        if order_number_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "ORDER_NUMBER_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret,
            jwt_secret_is_default,
            log_format,
            database,
            order_number_attempts,
            estimated_delivery_days: parse_or(
                &get,
                "ESTIMATED_DELIVERY_DAYS",
                defaults.estimated_delivery_days,
                parse_num,
            )?,
            retry,
            seed_path: get("SEED_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<G, T>(
    get: &G,
    key: &'static str,
    default: T,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => parse(&raw).ok_or(ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_num<T: FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
