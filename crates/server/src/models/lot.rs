//! Stock lot models: what is on the shelf, per medicine and lot code.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clinic_stock_core::{LotCode, LotSnapshot, MedicineId};

use super::Transaction;

/// A lot of one medicine and the quantity of it still on the shelf.
///
/// Lots are never deleted; a fully consumed lot stays at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Medicine the lot belongs to.
    pub medicine_id: MedicineId,
    /// Lot code, unique within the medicine.
    pub lot_code: LotCode,
    /// Units remaining (never negative).
    pub quantity: i64,
    /// Manufacture date; unknown for some legacy lots.
    pub mfg_date: Option<NaiveDate>,
    /// Expiry date.
    pub exp_date: NaiveDate,
    /// When the lot was created.
    pub created_at: DateTime<Utc>,
    /// When the lot was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// The view of this lot used by the FEFO planner.
    #[must_use]
    pub fn snapshot(&self) -> LotSnapshot {
        LotSnapshot {
            lot_code: self.lot_code.clone(),
            exp_date: self.exp_date,
            quantity: self.quantity,
        }
    }

    /// Whether the lot expires on or before `date`.
    #[must_use]
    pub fn expires_by(&self, date: NaiveDate) -> bool {
        self.exp_date <= date
    }
}

/// A lot row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLot {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    pub quantity: i64,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: NaiveDate,
}

/// Filter criteria for listing lots.
#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    /// Only lots of this medicine.
    pub medicine_id: Option<MedicineId>,
    /// Only lots with quantity > 0.
    pub has_remaining: bool,
    /// Only lots expiring on or before this date.
    pub expiring_by: Option<NaiveDate>,
}

/// Input for receiving a delivery into stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveInput {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    /// Units received (must be positive).
    pub quantity: i64,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: NaiveDate,
    pub note: Option<String>,
}

/// Input for loading an opening balance from earlier records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningBalanceInput {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    /// Signed units; non-zero.
    pub quantity: i64,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: NaiveDate,
    pub note: Option<String>,
}

/// Result of a receipt or opening balance: the lot after the change and
/// the ledger entry documenting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveOutcome {
    pub lot: Lot,
    pub transaction: Transaction,
}
