//! Rules for changing ledger history without breaking the stock balance.
//!
//! A lot's quantity must always equal the signed sum of the ledger deltas
//! recorded against its `(medicine, lot code)` pair. Editing or deleting a
//! historical entry therefore moves the lot by the same amount the ledger
//! moves. These functions compute that adjustment against the lot's current
//! quantity and refuse any change that would leave the lot below zero.
//!
//! A lot row that does not exist counts as holding zero units: taking stock
//! from it is refused like any other negative result, and putting stock into
//! it is refused because there is no row (and no expiry date) to hold it.

use thiserror::Error;

use crate::types::{LotCode, MAX_QUANTITY, MedicineId, TransactionKind, is_valid_quantity};

/// Why an edit or delete of a ledger entry was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// Opening balances accept note changes only.
    #[error("the quantity of an opening balance entry cannot be changed")]
    InitialBalanceLocked,

    /// Edited quantity was not positive or exceeded [`MAX_QUANTITY`].
    #[error("quantity must be between 1 and {max} (got {0})", max = MAX_QUANTITY)]
    InvalidQuantity(i64),

    /// Applying the change would drive the lot below zero.
    #[error(
        "lot {lot_code} of {medicine_id} holds {current}; applying {change} would leave {resulting}"
    )]
    WouldGoNegative {
        medicine_id: MedicineId,
        lot_code: LotCode,
        current: i64,
        change: i64,
        resulting: i64,
    },

    /// The change would return stock to a lot that has no stock record.
    ///
    /// A policy refusal, not a non-negativity violation: the missing lot
    /// counts as zero and the result would be positive. Edits and deletes
    /// never recreate a lot row, since its dates are no longer known.
    #[error("lot {lot_code} of {medicine_id} has no stock record to return {change} units to")]
    MissingLot {
        medicine_id: MedicineId,
        lot_code: LotCode,
        change: i64,
    },
}

/// The ledger entry being edited or deleted.
#[derive(Debug, Clone, Copy)]
pub struct LedgerEntryRef<'a> {
    pub medicine_id: &'a MedicineId,
    pub lot_code: &'a LotCode,
    pub kind: TransactionKind,
    pub delta: i64,
}

/// Lot movement that keeps the ledger and the lot in balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotAdjustment {
    /// New signed delta of the entry (unchanged for deletes and note-only edits).
    pub new_delta: i64,
    /// Signed change to apply to the lot; zero means the lot is left alone.
    pub change: i64,
    /// Lot quantity after the change.
    pub resulting: i64,
}

/// Work out the lot adjustment for editing an entry's quantity.
///
/// `new_quantity` is the unsigned magnitude the entry should carry; its sign
/// comes from the entry's kind. `None` means only the note changes.
/// `lot_quantity` is the lot's current quantity, `None` if no lot row exists.
///
/// # Errors
///
/// - `InitialBalanceLocked` if the entry is an opening balance and the
///   magnitude differs from the recorded one
/// - `InvalidQuantity` if `new_quantity` is not positive or above
///   [`MAX_QUANTITY`]
/// - `WouldGoNegative` / `MissingLot` if the lot cannot absorb the change
pub fn plan_edit(
    entry: LedgerEntryRef<'_>,
    new_quantity: Option<i64>,
    lot_quantity: Option<i64>,
) -> Result<LotAdjustment, ReconciliationError> {
    let Some(magnitude) = new_quantity else {
        return Ok(unchanged(entry, lot_quantity));
    };

    if !is_valid_quantity(magnitude) {
        return Err(ReconciliationError::InvalidQuantity(magnitude));
    }

    if !entry.kind.quantity_editable() {
        if magnitude == entry.delta.abs() {
            return Ok(unchanged(entry, lot_quantity));
        }
        return Err(ReconciliationError::InitialBalanceLocked);
    }

    let new_delta = entry.kind.signed(magnitude, entry.delta);
    let change = new_delta - entry.delta;
    let resulting = check_lot(entry, change, lot_quantity)?;

    Ok(LotAdjustment {
        new_delta,
        change,
        resulting,
    })
}

/// Work out the lot adjustment for deleting an entry.
///
/// Deleting reverses the entry's original effect on the lot.
///
/// # Errors
///
/// Returns `WouldGoNegative` / `MissingLot` if the lot cannot absorb the
/// reversal.
pub fn plan_delete(
    entry: LedgerEntryRef<'_>,
    lot_quantity: Option<i64>,
) -> Result<LotAdjustment, ReconciliationError> {
    let change = -entry.delta;
    let resulting = check_lot(entry, change, lot_quantity)?;

    Ok(LotAdjustment {
        new_delta: entry.delta,
        change,
        resulting,
    })
}

fn unchanged(entry: LedgerEntryRef<'_>, lot_quantity: Option<i64>) -> LotAdjustment {
    LotAdjustment {
        new_delta: entry.delta,
        change: 0,
        resulting: lot_quantity.unwrap_or(0),
    }
}

fn check_lot(
    entry: LedgerEntryRef<'_>,
    change: i64,
    lot_quantity: Option<i64>,
) -> Result<i64, ReconciliationError> {
    let current = lot_quantity.unwrap_or(0);
    let resulting = current.saturating_add(change);

    if resulting < 0 {
        return Err(ReconciliationError::WouldGoNegative {
            medicine_id: entry.medicine_id.clone(),
            lot_code: entry.lot_code.clone(),
            current,
            change,
            resulting,
        });
    }

    if lot_quantity.is_none() && change > 0 {
        return Err(ReconciliationError::MissingLot {
            medicine_id: entry.medicine_id.clone(),
            lot_code: entry.lot_code.clone(),
            change,
        });
    }

    Ok(resulting)
}
