//! Clinic Stock server library.
//!
//! Stock ledger for a clinic pharmacy: lots per medicine, an append-only
//! (but correctable) transaction ledger, first-expired-first-out
//! dispensing and the reports built on top. The binary in `main.rs` serves
//! this over a JSON API on port 3002; the CLI drives the same service
//! directly.
//!
//! # Layers
//!
//! - [`db`] - `InventoryStore` trait with in-memory and `PostgreSQL` backends
//! - [`services`] - `InventoryService`, the only writer of stock
//! - [`routes`] - axum handlers mapping HTTP onto the service
//! - [`clock`] - injectable source of "now" and "today"

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
