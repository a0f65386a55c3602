//! Configuration loader for the `airwatch` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};

use crate::buffer::DEFAULT_CAPACITY;
use crate::poller::{DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL};

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable; blank counts as unset.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
}

/// Parse an optional boolean environment variable with a default value.
macro_rules! parse_env_bool {
    ($var_name:expr, $default:expr) => {
        match optional_env!($var_name).as_deref() {
            None => $default,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => bail!("Invalid {}: expected true/false, got '{}'", $var_name, other),
        }
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// HTTP listen port.
    pub port: u16,

    /// PostgreSQL connection string. `None` runs without a durable store.
    pub db_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// External sensor endpoint to poll. `None` leaves the poller unwired.
    pub sensor_endpoint: Option<String>,

    pub poll_interval: Duration,

    /// Per-request timeout for poll fetches.
    pub poll_timeout: Duration,

    /// Start polling at boot when an endpoint is configured.
    pub poll_autostart: bool,

    /// Live buffer cap, applied to every ingress path.
    pub buffer_capacity: usize,

    /// Path of the historical city/day CSV.
    pub history_csv: PathBuf,

    /// Location tag stamped on live records in the merged dataset.
    pub live_location_tag: String,
}

impl Default for Config {
    fn default() -> Self {
        // ---
        Config {
            port: 3001,
            db_url: None,
            db_pool_max: 5,
            sensor_endpoint: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_FETCH_TIMEOUT,
            poll_autostart: true,
            buffer_capacity: DEFAULT_CAPACITY,
            history_csv: PathBuf::from("data/city_day.csv"),
            live_location_tag: "Live Sensor".to_string(),
        }
    }
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `PORT` – listen port (default: 3001)
/// - `DATABASE_URL` – PostgreSQL connection string (default: none)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SENSOR_ENDPOINT` – external sensor URL to poll (default: none)
/// - `POLL_INTERVAL_MS` – poll interval (default: 5000)
/// - `POLL_TIMEOUT_MS` – per-request timeout (default: 10000)
/// - `POLL_AUTOSTART` – start polling at boot (default: true)
/// - `BUFFER_CAPACITY` – live buffer cap (default: 100)
/// - `CITY_DAY_CSV` – historical dataset path (default: data/city_day.csv)
/// - `LIVE_LOCATION_TAG` – tag for live records (default: "Live Sensor")
///
/// Returns an error if any variable is invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let defaults = Config::default();

    let port = parse_env!("PORT", u16, defaults.port);
    let db_url = optional_env!("DATABASE_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, defaults.db_pool_max);
    let sensor_endpoint = optional_env!("SENSOR_ENDPOINT");
    let poll_interval_ms = parse_env!("POLL_INTERVAL_MS", u64, 5000);
    let poll_timeout_ms = parse_env!("POLL_TIMEOUT_MS", u64, 10_000);
    let poll_autostart = parse_env_bool!("POLL_AUTOSTART", defaults.poll_autostart);
    let buffer_capacity = parse_env!("BUFFER_CAPACITY", usize, defaults.buffer_capacity);
    let history_csv = optional_env!("CITY_DAY_CSV")
        .map(PathBuf::from)
        .unwrap_or(defaults.history_csv);
    let live_location_tag =
        optional_env!("LIVE_LOCATION_TAG").unwrap_or(defaults.live_location_tag);

    let cfg = Config {
        port,
        db_url,
        db_pool_max,
        sensor_endpoint,
        poll_interval: Duration::from_millis(poll_interval_ms),
        poll_timeout: Duration::from_millis(poll_timeout_ms),
        poll_autostart,
        buffer_capacity,
        history_csv,
        live_location_tag,
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Mask the password component of a connection URL.
fn mask_db_url(db_url: &str) -> String {
    // ---
    let (Some(at_pos), Some(scheme_end)) = (db_url.rfind('@'), db_url.find("://")) else {
        return db_url.to_string();
    };
    let user_start = scheme_end + 3;
    if user_start > at_pos {
        return db_url.to_string();
    }

    match db_url[user_start..at_pos].find(':') {
        Some(colon) => format!(
            "{}:****{}",
            &db_url[..user_start + colon],
            &db_url[at_pos..]
        ),
        None => db_url.to_string(),
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.buffer_capacity == 0 {
            bail!("BUFFER_CAPACITY must be at least 1");
        }
        if self.poll_interval.is_zero() {
            bail!("POLL_INTERVAL_MS must be greater than 0");
        }
        if self.poll_timeout.is_zero() {
            bail!("POLL_TIMEOUT_MS must be greater than 0");
        }
        if self.db_pool_max == 0 {
            bail!("DB_POOL_MAX must be at least 1");
        }
        Ok(())
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let masked_db_url = self
            .db_url
            .as_deref()
            .map(mask_db_url)
            .unwrap_or_else(|| "(not set)".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  PORT              : {}", self.port);
        tracing::info!("  DATABASE_URL      : {}", masked_db_url);
        tracing::info!("  DB_POOL_MAX       : {}", self.db_pool_max);
        tracing::info!(
            "  SENSOR_ENDPOINT   : {}",
            self.sensor_endpoint.as_deref().unwrap_or("(not set)")
        );
        tracing::info!("  POLL_INTERVAL_MS  : {}", self.poll_interval.as_millis());
        tracing::info!("  POLL_TIMEOUT_MS   : {}", self.poll_timeout.as_millis());
        tracing::info!("  POLL_AUTOSTART    : {}", self.poll_autostart);
        tracing::info!("  BUFFER_CAPACITY   : {}", self.buffer_capacity);
        tracing::info!("  CITY_DAY_CSV      : {}", self.history_csv.display());
        tracing::info!("  LIVE_LOCATION_TAG : {}", self.live_location_tag);
    }
}
