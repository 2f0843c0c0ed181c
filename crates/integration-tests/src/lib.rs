//! Integration tests for Clinic Stock.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p clinic-stock-integration-tests
//! ```
//!
//! Everything runs against the in-memory store with a fixed clock; the HTTP
//! tests start the real router on an ephemeral local port.
//!
//! # Test Categories
//!
//! - `fefo_dispensing` - allocation order, batches, all-or-nothing
//! - `ledger_reconciliation` - edits and deletes keep lots and ledger in step
//! - `reports` - alerts, dashboard, monthly report, audit
//! - `concurrency` - parallel writers against one medicine
//! - `http_api` - JSON API end to end

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::NaiveDate;

use clinic_stock_core::{LotCode, MedicineCategory, MedicineId};
use clinic_stock_server::clock::FixedClock;
use clinic_stock_server::config::InventorySettings;
use clinic_stock_server::db::MemoryInventoryStore;
use clinic_stock_server::models::{
    CreateMedicineInput, Lot, ReceiveInput, ReceiveOutcome, RequestContext,
};
use clinic_stock_server::routes;
use clinic_stock_server::services::InventoryService;
use clinic_stock_server::state::AppState;

/// Date all tests treat as "today" unless they pick their own.
pub const TODAY: &str = "2025-06-15";

/// Service and store wired together for a test.
pub struct TestContext {
    pub service: Arc<InventoryService>,
    pub store: Arc<MemoryInventoryStore>,
}

impl TestContext {
    /// Empty store, default settings, clock frozen on [`TODAY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(TODAY, InventorySettings::default())
    }

    /// Empty store with the clock frozen at midday UTC on `today`.
    #[must_use]
    pub fn with_settings(today: &str, settings: InventorySettings) -> Self {
        let store = Arc::new(MemoryInventoryStore::new());
        let service = InventoryService::new(
            store.clone(),
            Arc::new(FixedClock::on(date(today))),
            settings,
        );
        Self {
            service: Arc::new(service),
            store,
        }
    }

    /// Add an active essential drug.
    pub async fn medicine(&self, id: &str, min_stock: i64) {
        self.medicine_in(id, MedicineCategory::EssentialDrug, min_stock)
            .await;
    }

    /// Add an active medicine of the given category.
    pub async fn medicine_in(&self, id: &str, category: MedicineCategory, min_stock: i64) {
        self.service
            .create_medicine(
                CreateMedicineInput {
                    id: med(id),
                    name: format!("{id} name"),
                    unit: "tablet".to_owned(),
                    category,
                    min_stock,
                },
                &admin(),
            )
            .await
            .unwrap();
    }

    /// Receive `quantity` units into a lot as the default staff member.
    pub async fn receive(&self, id: &str, lot_code: &str, quantity: i64, exp: &str) -> ReceiveOutcome {
        self.service
            .receive(
                ReceiveInput {
                    medicine_id: med(id),
                    lot_code: lot(lot_code),
                    quantity,
                    mfg_date: None,
                    exp_date: date(exp),
                    note: None,
                },
                &staff(),
            )
            .await
            .unwrap()
    }

    /// Every lot of a medicine, consumed ones included.
    pub async fn lots(&self, id: &str) -> Vec<Lot> {
        self.service.lots_for_medicine(&med(id)).await.unwrap()
    }

    /// Quantity of one lot.
    pub async fn lot_quantity(&self, id: &str, lot_code: &str) -> i64 {
        self.lots(id)
            .await
            .into_iter()
            .find(|l| l.lot_code.as_str() == lot_code)
            .map_or(0, |l| l.quantity)
    }

    /// Assert every lot equals the sum of its ledger deltas.
    pub async fn assert_balanced(&self) {
        let discrepancies = self.service.audit_ledger().await.unwrap();
        assert!(discrepancies.is_empty(), "ledger drift: {discrepancies:?}");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve the full router over a fresh in-memory store on an ephemeral
/// local port, with the clock frozen on [`TODAY`].
pub async fn spawn_server() -> SocketAddr {
    let service = InventoryService::new(
        Arc::new(MemoryInventoryStore::new()),
        Arc::new(FixedClock::on(date(TODAY))),
        InventorySettings::default(),
    );
    let app = routes::app(AppState::new(service));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[must_use]
pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[must_use]
pub fn med(id: &str) -> MedicineId {
    MedicineId::parse(id).unwrap()
}

#[must_use]
pub fn lot(code: &str) -> LotCode {
    LotCode::parse(code).unwrap()
}

/// Staff member recording most test movements.
#[must_use]
pub fn staff() -> RequestContext {
    RequestContext::staff("nurse@clinic.test")
}

#[must_use]
pub fn admin() -> RequestContext {
    RequestContext::admin("head@clinic.test")
}
