//! Subcommand implementations.
//!
//! Every command except `migrate` goes through [`InventoryService`], the
//! same service the HTTP API uses, so the CLI enforces the same stock and
//! permission rules.

pub mod ledger;
pub mod medicine;
pub mod migrate;
pub mod report;
pub mod stock;

use std::sync::Arc;

use thiserror::Error;

use clinic_stock_server::clock::SystemClock;
use clinic_stock_server::config::{self, ConfigError, StockConfig};
use clinic_stock_server::db::{self, PgInventoryStore};
use clinic_stock_server::services::{InventoryError, InventoryService};

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Inventory operation was refused or failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Input file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid YAML for the expected shape.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connect to the configured database and build the inventory service.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the connection fails.
pub async fn connect() -> Result<InventoryService, CliError> {
    let database_url = config::required_database_url()?;
    let settings = StockConfig::from_env()?.inventory;

    tracing::debug!("Connecting to stock database...");
    let pool = db::create_pool(&database_url).await?;

    Ok(InventoryService::new(
        Arc::new(PgInventoryStore::new(pool)),
        Arc::new(SystemClock::new(settings.utc_offset)),
        settings,
    ))
}
