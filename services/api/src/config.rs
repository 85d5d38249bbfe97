//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use batch_scheduling_core::SchedulingConfig;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: Level,
    pub default_meet_link: Option<String>,
    pub default_timezone: String,
    pub generation_days_ahead: u32,
    pub generation_limit: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address = parse_or("BIND_ADDRESS", &lookup, "0.0.0.0:3000".parse::<SocketAddr>())?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", &lookup, Ok::<u32, ConfigError>(5))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Scheduling Settings ---
        let default_meet_link = lookup("DEFAULT_MEET_LINK").filter(|l| !l.trim().is_empty());
        let default_timezone =
            lookup("DEFAULT_TIMEZONE").unwrap_or_else(|| "Asia/Kolkata".to_string());
        let generation_days_ahead =
            parse_or("GENERATION_DAYS_AHEAD", &lookup, Ok::<u32, ConfigError>(30))?;
        let generation_limit = parse_or("GENERATION_LIMIT", &lookup, Ok::<u32, ConfigError>(12))?;

        Ok(Self {
            bind_address,
            database_url,
            db_max_connections,
            log_level,
            default_meet_link,
            default_timezone,
            generation_days_ahead,
            generation_limit,
        })
    }

    /// The subset of settings handed to the scheduling service.
    pub fn scheduling(&self) -> SchedulingConfig {
        SchedulingConfig {
            default_meet_link: self.default_meet_link.clone(),
            default_timezone: self.default_timezone.clone(),
            default_days_ahead: self.generation_days_ahead,
            default_limit: self.generation_limit,
        }
    }
}

/// Parses `key` when present, otherwise falls back to `default`.
fn parse_or<T, E, F>(key: &str, lookup: &F, default: Result<T, E>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => default.map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
    }
}
