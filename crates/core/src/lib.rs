//! Clinic Stock Core - domain types and stock-keeping rules.
//!
//! This crate provides the pieces of the clinic stock tracker that do not
//! touch storage:
//! - `server` - JSON API and service layer over a persistence backend
//! - `cli` - Command-line tools for master data, stock movements and reports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no clock. Planning a dispense or checking a ledger edit
//! happens here against a snapshot; applying the result is the caller's job.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids and codes, transaction kinds, categories and roles
//! - [`allocator`] - First-expired-first-out dispensing planner
//! - [`reconcile`] - Rules for editing and deleting historical ledger entries

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocator;
pub mod reconcile;
pub mod types;

pub use allocator::{
    AllocationError, AllocationLine, AllocationPlan, LotSnapshot, plan_fefo, plan_fefo_batch,
};
pub use reconcile::{LedgerEntryRef, LotAdjustment, ReconciliationError, plan_delete, plan_edit};
pub use types::*;
