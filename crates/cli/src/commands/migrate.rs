//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! stock-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOCK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/server/migrations/`, embedded at compile time.

use secrecy::ExposeSecret;
use sqlx::PgPool;

use clinic_stock_server::config;
use clinic_stock_server::db::MIGRATOR;

use super::CliError;

/// Run the stock database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails or
/// a migration fails.
pub async fn run() -> Result<(), CliError> {
    let database_url = config::required_database_url()?;

    tracing::info!("Connecting to stock database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running stock migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Stock migrations complete!");
    Ok(())
}
