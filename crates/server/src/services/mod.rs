//! Business logic services.
//!
//! - [`InventoryService`] - receive, dispense, ledger corrections, master data
//! - [`reports`] - pure report builders and the plain-text monthly rendering

pub mod inventory;
pub mod locks;
pub mod reports;

pub use inventory::{InventoryError, InventoryService};
pub use locks::MedicineLocks;
