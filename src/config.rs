// src/config.rs

use std::{env, net::SocketAddr, time::Duration};

/// Interval between two countdown ticks of a timed attempt.
pub const TIMER_TICK: Duration = Duration::from_secs(1);

/// How long a submitted session stays readable before it is evicted from memory.
pub const SUBMITTED_RETENTION: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service keeps everything in memory.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub log_dir: String,
}

impl Config {
    /// Reads the process environment. `.env` is loaded by `main` beforehand.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "JWT_EXPIRATION",
                value: raw,
            })?,
            Err(_) => 3600,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value: raw,
            })?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            log_dir,
        })
    }
}
