//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOCK_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either the service keeps stock in memory)
//! - `STOCK_HOST` - Bind address (default: 127.0.0.1)
//! - `STOCK_PORT` - Listen port (default: 3002)
//! - `STOCK_NEAR_EXPIRY_DAYS` - Near-expiry alert horizon in days (default: 90)
//! - `STOCK_DASHBOARD_EXPIRY_DAYS` - Dashboard expiry horizon in days (default: 180)
//! - `STOCK_REPORT_TOP_N` - Entries in the monthly top received/dispensed lists (default: 5)
//! - `STOCK_REPORT_LIST_LIMIT` - Items listed per section in the rendered monthly report (default: 10)
//! - `STOCK_DUPLICATE_LOT_POLICY` - `reject` or `top_up` (default: reject)
//! - `STOCK_UTC_OFFSET_HOURS` - Clinic UTC offset used for "today" (default: 0)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What to do when a receipt names a lot that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateLotPolicy {
    /// Refuse the receipt.
    #[default]
    Reject,
    /// Add the units to the existing lot if its dates match.
    TopUp,
}

impl FromStr for DuplicateLotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "top_up" | "topup" => Ok(Self::TopUp),
            other => Err(format!("expected `reject` or `top_up`, got `{other}`")),
        }
    }
}

/// Business settings for the inventory service.
#[derive(Debug, Clone)]
pub struct InventorySettings {
    /// Horizon for near-expiry alerts and the monthly report.
    pub near_expiry_days: u32,
    /// Horizon for the dashboard summary.
    pub dashboard_expiry_days: u32,
    /// Entries in the monthly top received/dispensed lists.
    pub report_top_n: usize,
    /// Items listed per section in the rendered monthly report.
    pub report_list_limit: usize,
    /// Handling of receipts into an existing lot.
    pub duplicate_lot_policy: DuplicateLotPolicy,
    /// Clinic UTC offset.
    pub utc_offset: FixedOffset,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            near_expiry_days: 90,
            dashboard_expiry_days: 180,
            report_top_n: 5,
            report_list_limit: 10,
            duplicate_lot_policy: DuplicateLotPolicy::Reject,
            utc_offset: Utc.fix(),
        }
    }
}

impl InventorySettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            near_expiry_days: parse_env_or("STOCK_NEAR_EXPIRY_DAYS", defaults.near_expiry_days)?,
            dashboard_expiry_days: parse_env_or(
                "STOCK_DASHBOARD_EXPIRY_DAYS",
                defaults.dashboard_expiry_days,
            )?,
            report_top_n: parse_env_or("STOCK_REPORT_TOP_N", defaults.report_top_n)?,
            report_list_limit: parse_env_or("STOCK_REPORT_LIST_LIMIT", defaults.report_list_limit)?,
            duplicate_lot_policy: parse_env_or(
                "STOCK_DUPLICATE_LOT_POLICY",
                defaults.duplicate_lot_policy,
            )?,
            utc_offset: match get_optional_env("STOCK_UTC_OFFSET_HOURS") {
                Some(raw) => parse_utc_offset(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("STOCK_UTC_OFFSET_HOURS".to_string(), e)
                })?,
                None => defaults.utc_offset,
            },
        })
    }
}

/// Stock service configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct StockConfig {
    /// `PostgreSQL` connection URL (contains password); `None` for the
    /// in-memory store
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Business settings
    pub inventory: InventorySettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for StockConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("inventory", &self.inventory)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

impl StockConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOCK_DATABASE_URL");
        let host = get_env_or_default("STOCK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOCK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("STOCK_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOCK_PORT".to_string(), e.to_string()))?;
        let inventory = InventorySettings::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            inventory,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Read the database URL, failing if neither variable is set.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if no URL is configured.
pub fn required_database_url() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("STOCK_DATABASE_URL")
        .ok_or_else(|| ConfigError::MissingEnvVar("STOCK_DATABASE_URL".to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a whole-hour UTC offset such as `7`, `+7` or `-3`.
fn parse_utc_offset(raw: &str) -> Result<FixedOffset, String> {
    let hours: i32 = raw
        .trim()
        .trim_start_matches('+')
        .parse()
        .map_err(|_| format!("expected whole hours, got `{raw}`"))?;
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| format!("offset out of range: {hours}"))
}
