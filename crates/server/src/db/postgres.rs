//! `PostgreSQL` store.
//!
//! Queries are bound at runtime against the row types below; enum columns
//! are stored as text and parsed on the way out. A change set runs inside a
//! single database transaction, and lot adjustments use a conditional update
//! so a lot can never be driven below zero, even by another process.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::migrate::Migrator;
use sqlx::{PgConnection, PgPool};

use clinic_stock_core::{LotCode, MedicineId, TransactionId};

use super::{ChangeSet, CommitReceipt, InventoryStore, RepositoryError, StockChange};
use crate::models::{
    Lot, LotFilter, Medicine, MedicineFilter, NewLot, NewTransaction, Transaction,
    TransactionFilter,
};

/// Embedded schema migrations for the `stock` schema.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct MedicineRow {
    id: MedicineId,
    name: String,
    unit: String,
    category: String,
    min_stock: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MedicineRow> for Medicine {
    type Error = RepositoryError;

    fn try_from(row: MedicineRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: row.id,
            name: row.name,
            unit: row.unit,
            category,
            min_stock: row.min_stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LotRow {
    medicine_id: MedicineId,
    lot_code: LotCode,
    quantity: i64,
    mfg_date: Option<NaiveDate>,
    exp_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LotRow> for Lot {
    fn from(row: LotRow) -> Self {
        Self {
            medicine_id: row.medicine_id,
            lot_code: row.lot_code,
            quantity: row.quantity,
            mfg_date: row.mfg_date,
            exp_date: row.exp_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: TransactionId,
    medicine_id: MedicineId,
    lot_code: LotCode,
    delta: i64,
    kind: String,
    actor: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse().map_err(RepositoryError::DataCorruption)?;
        Ok(Self {
            id: row.id,
            medicine_id: row.medicine_id,
            lot_code: row.lot_code,
            delta: row.delta,
            kind,
            actor: row.actor,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_lot(
    conn: &mut PgConnection,
    lot: &NewLot,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO stock.lot (medicine_id, lot_code, quantity, mfg_date, exp_date, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ",
    )
    .bind(&lot.medicine_id)
    .bind(&lot.lot_code)
    .bind(lot.quantity)
    .bind(lot.mfg_date)
    .bind(lot.exp_date)
    .bind(at)
    .execute(conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return RepositoryError::Conflict(format!(
                    "lot {} of {} already exists",
                    lot.lot_code, lot.medicine_id
                ));
            }
            if db_err.is_check_violation() {
                return RepositoryError::NegativeQuantity {
                    medicine_id: lot.medicine_id.clone(),
                    lot_code: lot.lot_code.clone(),
                };
            }
        }
        RepositoryError::Database(e)
    })?;

    Ok(())
}

/// `numeric_value_out_of_range`, raised when `quantity + delta` leaves BIGINT.
fn is_numeric_overflow(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "22003")
}

async fn adjust_lot(
    conn: &mut PgConnection,
    medicine_id: &MedicineId,
    lot_code: &LotCode,
    delta: i64,
    at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let updated = sqlx::query(
        r"
        UPDATE stock.lot
        SET quantity = quantity + $3, updated_at = $4
        WHERE medicine_id = $1 AND lot_code = $2 AND quantity + $3 >= 0
        ",
    )
    .bind(medicine_id)
    .bind(lot_code)
    .bind(delta)
    .bind(at)
    .execute(&mut *conn)
    .await
    .map_err(|err| {
        if is_numeric_overflow(&err) {
            RepositoryError::QuantityOverflow {
                medicine_id: medicine_id.clone(),
                lot_code: lot_code.clone(),
            }
        } else {
            RepositoryError::Database(err)
        }
    })?;

    if updated.rows_affected() > 0 {
        return Ok(());
    }

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM stock.lot WHERE medicine_id = $1 AND lot_code = $2)",
    )
    .bind(medicine_id)
    .bind(lot_code)
    .fetch_one(conn)
    .await?;

    if exists {
        Err(RepositoryError::NegativeQuantity {
            medicine_id: medicine_id.clone(),
            lot_code: lot_code.clone(),
        })
    } else {
        Err(RepositoryError::NotFound)
    }
}

async fn insert_transaction(
    conn: &mut PgConnection,
    new: &NewTransaction,
) -> Result<Transaction, RepositoryError> {
    let row = sqlx::query_as::<_, TransactionRow>(
        r"
        INSERT INTO stock.ledger_entry (medicine_id, lot_code, delta, kind, actor, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, medicine_id, lot_code, delta, kind, actor, note, created_at
        ",
    )
    .bind(&new.medicine_id)
    .bind(&new.lot_code)
    .bind(new.delta)
    .bind(new.kind.as_str())
    .bind(&new.actor)
    .bind(new.note.as_deref())
    .bind(new.created_at)
    .fetch_one(conn)
    .await?;

    row.try_into()
}

async fn update_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
    delta: i64,
    note: Option<&str>,
) -> Result<Transaction, RepositoryError> {
    let row = sqlx::query_as::<_, TransactionRow>(
        r"
        UPDATE stock.ledger_entry
        SET delta = $2, note = $3
        WHERE id = $1
        RETURNING id, medicine_id, lot_code, delta, kind, actor, note, created_at
        ",
    )
    .bind(id)
    .bind(delta)
    .bind(note)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    row.try_into()
}

async fn delete_transaction(
    conn: &mut PgConnection,
    id: TransactionId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM stock.ledger_entry WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn insert_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO stock.medicine (id, name, unit, category, min_stock, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.unit)
        .bind(medicine.category.as_str())
        .bind(medicine.min_stock)
        .bind(medicine.is_active)
        .bind(medicine.created_at)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "medicine {} already exists",
                    medicine.id
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn get_medicine(&self, id: &MedicineId) -> Result<Option<Medicine>, RepositoryError> {
        sqlx::query_as::<_, MedicineRow>(
            r"
            SELECT id, name, unit, category, min_stock, is_active, created_at, updated_at
            FROM stock.medicine
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_medicines(
        &self,
        filter: MedicineFilter,
    ) -> Result<Vec<Medicine>, RepositoryError> {
        let rows = sqlx::query_as::<_, MedicineRow>(
            r#"
            SELECT id, name, unit, category, min_stock, is_active, created_at, updated_at
            FROM stock.medicine
            WHERE $1 OR is_active
            ORDER BY id COLLATE "C"
            "#,
        )
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE stock.medicine
            SET name = $2, unit = $3, category = $4, min_stock = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(&medicine.id)
        .bind(&medicine.name)
        .bind(&medicine.unit)
        .bind(medicine.category.as_str())
        .bind(medicine.min_stock)
        .bind(medicine.is_active)
        .bind(medicine.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_medicine(&self, id: &MedicineId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM stock.medicine WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict(format!(
                        "medicine {id} still has lots or ledger entries"
                    ));
                }
                RepositoryError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_lot(
        &self,
        medicine_id: &MedicineId,
        lot_code: &LotCode,
    ) -> Result<Option<Lot>, RepositoryError> {
        let row = sqlx::query_as::<_, LotRow>(
            r"
            SELECT medicine_id, lot_code, quantity, mfg_date, exp_date, created_at, updated_at
            FROM stock.lot
            WHERE medicine_id = $1 AND lot_code = $2
            ",
        )
        .bind(medicine_id)
        .bind(lot_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_lots(&self, filter: &LotFilter) -> Result<Vec<Lot>, RepositoryError> {
        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT medicine_id, lot_code, quantity, mfg_date, exp_date, created_at, updated_at
            FROM stock.lot
            WHERE
                ($1::text IS NULL OR medicine_id = $1)
                AND (NOT $2 OR quantity > 0)
                AND ($3::date IS NULL OR exp_date <= $3)
            ORDER BY medicine_id COLLATE "C", exp_date, lot_code COLLATE "C"
            "#,
        )
        .bind(filter.medicine_id.as_ref())
        .bind(filter.has_remaining)
        .bind(filter.expiring_by)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        sqlx::query_as::<_, TransactionRow>(
            r"
            SELECT id, medicine_id, lot_code, delta, kind, actor, note, created_at
            FROM stock.ledger_entry
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r"
            SELECT id, medicine_id, lot_code, delta, kind, actor, note, created_at
            FROM stock.ledger_entry
            WHERE
                ($1::text IS NULL OR medicine_id = $1)
                AND ($2::text IS NULL OR kind = $2)
                AND ($3::timestamptz IS NULL OR created_at >= $3)
                AND ($4::timestamptz IS NULL OR created_at < $4)
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(filter.medicine_id.as_ref())
        .bind(filter.kind.map(|kind| kind.as_str()))
        .bind(filter.from)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn has_transactions(&self, medicine_id: &MedicineId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM stock.ledger_entry WHERE medicine_id = $1)",
        )
        .bind(medicine_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = CommitReceipt::default();
        let mut touched: Vec<(MedicineId, LotCode)> = Vec::new();
        let mut seen = BTreeSet::new();
        let at = changes.at;

        for change in changes.changes {
            match change {
                StockChange::CreateLot(lot) => {
                    insert_lot(&mut tx, &lot, at).await?;
                    let key = (lot.medicine_id, lot.lot_code);
                    if seen.insert(key.clone()) {
                        touched.push(key);
                    }
                }
                StockChange::AdjustLot {
                    medicine_id,
                    lot_code,
                    delta,
                } => {
                    adjust_lot(&mut tx, &medicine_id, &lot_code, delta, at).await?;
                    let key = (medicine_id, lot_code);
                    if seen.insert(key.clone()) {
                        touched.push(key);
                    }
                }
                StockChange::Record(new) => {
                    receipt.recorded.push(insert_transaction(&mut tx, &new).await?);
                }
                StockChange::UpdateTransaction { id, delta, note } => {
                    receipt
                        .updated
                        .push(update_transaction(&mut tx, id, delta, note.as_deref()).await?);
                }
                StockChange::DeleteTransaction(id) => {
                    delete_transaction(&mut tx, id).await?;
                }
            }
        }

        for (medicine_id, lot_code) in &touched {
            let row = sqlx::query_as::<_, LotRow>(
                r"
                SELECT medicine_id, lot_code, quantity, mfg_date, exp_date, created_at, updated_at
                FROM stock.lot
                WHERE medicine_id = $1 AND lot_code = $2
                ",
            )
            .bind(medicine_id)
            .bind(lot_code)
            .fetch_one(&mut *tx)
            .await?;
            receipt.lots.push(row.into());
        }

        tx.commit().await?;
        Ok(receipt)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
