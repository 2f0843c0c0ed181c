//! First-expired-first-out (FEFO) dispensing planner.
//!
//! Given a snapshot of a medicine's lots and a requested quantity, the
//! planner decides how many units to take from each lot: soonest expiry
//! first, lexical lot code breaking ties. It never mutates anything; callers
//! apply the returned [`AllocationPlan`] (lot decrements plus one `DISPENSE`
//! ledger entry per line) as a single atomic unit.
//!
//! Availability is checked before any line is produced, so a request that
//! cannot be met in full yields [`AllocationError::InsufficientStock`] and
//! no plan at all.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{LotCode, MAX_QUANTITY, MedicineId, is_valid_quantity};

/// Errors produced while planning a dispense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Requested quantity was not positive or exceeded [`MAX_QUANTITY`].
    #[error("requested quantity must be between 1 and {max} (got {0})", max = MAX_QUANTITY)]
    InvalidQuantity(i64),

    /// Total available stock is lower than the requested quantity.
    #[error("insufficient stock for {medicine_id}: requested {requested}, available {available}")]
    InsufficientStock {
        medicine_id: MedicineId,
        requested: i64,
        available: i64,
    },
}

/// The part of a lot the planner looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub lot_code: LotCode,
    pub exp_date: NaiveDate,
    pub quantity: i64,
}

/// Units taken from one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub lot_code: LotCode,
    pub exp_date: NaiveDate,
    pub quantity: i64,
}

/// How one dispense request is split across lots, in consumption order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub medicine_id: MedicineId,
    pub requested: i64,
    pub lines: Vec<AllocationLine>,
}

impl AllocationPlan {
    /// Sum of units across all lines; equals `requested` for any plan the
    /// planner returns.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

/// Sort lots into FEFO consumption order.
pub fn fefo_order(lots: &mut [LotSnapshot]) {
    lots.sort_by(|a, b| {
        a.exp_date
            .cmp(&b.exp_date)
            .then_with(|| a.lot_code.cmp(&b.lot_code))
    });
}

/// Total units across lots holding stock.
#[must_use]
pub fn available_quantity(lots: &[LotSnapshot]) -> i64 {
    lots.iter()
        .filter(|lot| lot.quantity > 0)
        .fold(0_i64, |acc, lot| acc.saturating_add(lot.quantity))
}

/// Plan a single dispense of `requested` units.
///
/// Lots with no remaining stock are ignored; the input need not be sorted.
///
/// # Errors
///
/// Returns `AllocationError::InvalidQuantity` if `requested` is not positive
/// or above [`MAX_QUANTITY`], and `AllocationError::InsufficientStock` if the lots cannot cover it.
pub fn plan_fefo(
    medicine_id: &MedicineId,
    lots: &[LotSnapshot],
    requested: i64,
) -> Result<AllocationPlan, AllocationError> {
    if !is_valid_quantity(requested) {
        return Err(AllocationError::InvalidQuantity(requested));
    }

    let available = available_quantity(lots);
    if available < requested {
        return Err(AllocationError::InsufficientStock {
            medicine_id: medicine_id.clone(),
            requested,
            available,
        });
    }

    let mut candidates: Vec<LotSnapshot> =
        lots.iter().filter(|lot| lot.quantity > 0).cloned().collect();
    fefo_order(&mut candidates);

    let mut lines = Vec::new();
    let mut remaining = requested;

    for lot in candidates {
        if remaining == 0 {
            break;
        }

        let take = remaining.min(lot.quantity);
        remaining -= take;
        lines.push(AllocationLine {
            lot_code: lot.lot_code,
            exp_date: lot.exp_date,
            quantity: take,
        });
    }

    Ok(AllocationPlan {
        medicine_id: medicine_id.clone(),
        requested,
        lines,
    })
}

/// Plan several dispense requests against one shared snapshot.
///
/// Each request is planned in order against the stock left over by the
/// requests before it, so two lines for the same medicine never double-book
/// a lot. Every line is validated before anything is returned: one failing
/// request fails the whole batch.
///
/// # Errors
///
/// Returns the first `AllocationError` encountered.
pub fn plan_fefo_batch(
    requests: &[(MedicineId, i64)],
    snapshots: &HashMap<MedicineId, Vec<LotSnapshot>>,
) -> Result<Vec<AllocationPlan>, AllocationError> {
    let mut working: HashMap<&MedicineId, Vec<LotSnapshot>> = HashMap::new();
    let mut plans = Vec::with_capacity(requests.len());

    for (medicine_id, requested) in requests {
        let lots = working
            .entry(medicine_id)
            .or_insert_with(|| snapshots.get(medicine_id).cloned().unwrap_or_default());

        let plan = plan_fefo(medicine_id, lots, *requested)?;

        for line in &plan.lines {
            if let Some(lot) = lots.iter_mut().find(|lot| lot.lot_code == line.lot_code) {
                lot.quantity -= line.quantity;
            }
        }

        plans.push(plan);
    }

    Ok(plans)
}
