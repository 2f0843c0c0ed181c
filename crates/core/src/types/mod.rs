//! Core types for Clinic Stock.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod id;
pub mod status;

pub use code::{CodeError, LotCode, MedicineId};
pub use id::*;
pub use status::*;

/// Largest unsigned quantity a single receipt, opening balance, dispense
/// line or edited entry may carry.
///
/// Keeping each movement within `i32` range leaves the `i64` lot and ledger
/// sums far from overflow.
pub const MAX_QUANTITY: i64 = 2_147_483_647;

/// Whether `quantity` is a valid unsigned movement size.
#[must_use]
pub const fn is_valid_quantity(quantity: i64) -> bool {
    quantity > 0 && quantity <= MAX_QUANTITY
}
