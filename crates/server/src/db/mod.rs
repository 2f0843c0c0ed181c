//! Storage for medicines, lots and the transaction ledger.
//!
//! # Tables (`stock` schema)
//!
//! - `medicine` - Master list of medicines and supplies
//! - `lot` - Units on hand per `(medicine_id, lot_code)`
//! - `ledger_entry` - Append-mostly ledger of signed quantity changes
//!
//! # Backends
//!
//! - [`PgInventoryStore`] - `PostgreSQL`, used in production
//! - [`MemoryInventoryStore`] - in-process maps, used when no database URL
//!   is configured and by the test suites
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! stock-cli migrate
//! ```
//!
//! # Atomicity
//!
//! Every stock movement is submitted as one [`ChangeSet`]. A backend applies
//! all of its changes or none of them: a failing step leaves lots and ledger
//! exactly as they were.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use clinic_stock_core::{LotCode, MedicineId, TransactionId};

use crate::models::{
    Lot, LotFilter, Medicine, MedicineFilter, NewLot, NewTransaction, Transaction,
    TransactionFilter,
};

pub use memory::MemoryInventoryStore;
pub use postgres::{MIGRATOR, PgInventoryStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate lot code).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A lot adjustment would have left the lot below zero.
    #[error("lot {lot_code} of {medicine_id} cannot go below zero")]
    NegativeQuantity {
        medicine_id: MedicineId,
        lot_code: LotCode,
    },

    /// A lot adjustment would have overflowed the stored quantity.
    #[error("lot {lot_code} of {medicine_id} cannot hold that many units")]
    QuantityOverflow {
        medicine_id: MedicineId,
        lot_code: LotCode,
    },
}

/// One step of an atomic stock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockChange {
    /// Insert a new lot. Fails with `Conflict` if the lot already exists.
    CreateLot(NewLot),
    /// Add `delta` to an existing lot. Fails with `NotFound` if the lot is
    /// missing, `NegativeQuantity` if the result would be below zero and
    /// `QuantityOverflow` if it would not fit.
    AdjustLot {
        medicine_id: MedicineId,
        lot_code: LotCode,
        delta: i64,
    },
    /// Append a ledger entry.
    Record(NewTransaction),
    /// Replace the delta and note of a ledger entry.
    UpdateTransaction {
        id: TransactionId,
        delta: i64,
        note: Option<String>,
    },
    /// Remove a ledger entry.
    DeleteTransaction(TransactionId),
}

/// Changes applied together or not at all.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Timestamp written to touched rows.
    pub at: DateTime<Utc>,
    pub changes: Vec<StockChange>,
}

impl ChangeSet {
    /// Start an empty change set stamped with `at`.
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            changes: Vec::new(),
        }
    }

    /// Append a change.
    pub fn push(&mut self, change: StockChange) -> &mut Self {
        self.changes.push(change);
        self
    }
}

/// Rows written by a committed [`ChangeSet`].
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    /// Lots created or adjusted, in the state after the commit, in the order
    /// they were first touched.
    pub lots: Vec<Lot>,
    /// Ledger entries appended, in submission order.
    pub recorded: Vec<Transaction>,
    /// Ledger entries updated, after the update.
    pub updated: Vec<Transaction>,
}

/// Persistence seam for the inventory service.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert a medicine. Fails with `Conflict` if the ID is taken.
    async fn insert_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError>;

    /// Get a medicine by ID.
    async fn get_medicine(&self, id: &MedicineId) -> Result<Option<Medicine>, RepositoryError>;

    /// List medicines ordered by ID.
    async fn list_medicines(
        &self,
        filter: MedicineFilter,
    ) -> Result<Vec<Medicine>, RepositoryError>;

    /// Overwrite a medicine's mutable fields. Fails with `NotFound` if missing.
    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError>;

    /// Delete a medicine row. Returns `false` if it did not exist.
    async fn delete_medicine(&self, id: &MedicineId) -> Result<bool, RepositoryError>;

    /// Get one lot.
    async fn get_lot(
        &self,
        medicine_id: &MedicineId,
        lot_code: &LotCode,
    ) -> Result<Option<Lot>, RepositoryError>;

    /// List lots ordered by medicine, expiry date, then lot code.
    async fn list_lots(&self, filter: &LotFilter) -> Result<Vec<Lot>, RepositoryError>;

    /// Get one ledger entry.
    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepositoryError>;

    /// List ledger entries in recording order (timestamp, then ID).
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, RepositoryError>;

    /// Whether any ledger entry references the medicine.
    async fn has_transactions(&self, medicine_id: &MedicineId) -> Result<bool, RepositoryError>;

    /// Apply a change set atomically.
    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
