//! Ledger entry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinic_stock_core::{AllocationPlan, LotCode, MedicineId, TransactionId, TransactionKind};

/// One recorded quantity change.
///
/// The lot is referenced by `(medicine_id, lot_code)` only; legacy entries
/// may name a lot that has no stock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique entry ID.
    pub id: TransactionId,
    /// Medicine moved.
    pub medicine_id: MedicineId,
    /// Lot moved.
    pub lot_code: LotCode,
    /// Signed quantity change (positive = into stock).
    pub delta: i64,
    /// Kind of movement.
    pub kind: TransactionKind,
    /// Who recorded the entry.
    pub actor: String,
    /// Optional free-text note.
    pub note: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// A ledger row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    pub delta: i64,
    pub kind: TransactionKind,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter criteria for listing ledger entries.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Only entries for this medicine.
    pub medicine_id: Option<MedicineId>,
    /// Only entries of this kind.
    pub kind: Option<TransactionKind>,
    /// Only entries created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Only entries created strictly before this instant.
    pub until: Option<DateTime<Utc>>,
}

/// A ledger entry with the medicine's running balance after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerLine {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub running_balance: i64,
}

/// Input for correcting a ledger entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditTransactionInput {
    /// New unsigned quantity; the sign follows the entry's kind.
    pub quantity: Option<i64>,
    /// New note; an empty string clears it.
    pub note: Option<String>,
}

/// One medicine and quantity in a dispense request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseLine {
    pub medicine_id: MedicineId,
    pub quantity: i64,
}

/// A dispense request covering one or more medicines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseRequest {
    pub lines: Vec<DispenseLine>,
    pub note: Option<String>,
}

/// How one dispense line was met: the FEFO plan and one ledger entry per lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseOutcome {
    pub plan: AllocationPlan,
    pub transactions: Vec<Transaction>,
}

/// Result of a multi-line dispense, in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDispenseOutcome {
    pub lines: Vec<DispenseOutcome>,
}
