//! Alerts, dashboard summary, monthly report and ledger audit.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use clinic_stock_core::MedicineCategory;
use clinic_stock_integration_tests::{TestContext, admin, date, lot, med, staff};
use clinic_stock_server::clock::FixedClock;
use clinic_stock_server::config::InventorySettings;
use clinic_stock_server::models::{ReceiveInput, ReportMonth};
use clinic_stock_server::services::InventoryService;

/// May activity recorded on 2025-05-10, plus one June receipt, reported on
/// 2025-06-15.
async fn may_scenario() -> (TestContext, InventoryService) {
    let may = TestContext::with_settings("2025-05-10", InventorySettings::default());
    may.medicine("PARA500", 50).await;
    may.medicine("AMOX250", 5).await;
    may.medicine_in("GAUZE", MedicineCategory::MedicalSupply, 10)
        .await;
    may.medicine("OLDMED", 10).await;
    may.service
        .deactivate_medicine(&med("OLDMED"), &admin())
        .await
        .unwrap();

    may.receive("PARA500", "A", 100, "2025-08-01").await;
    may.receive("AMOX250", "X", 30, "2026-05-01").await;
    may.receive("GAUZE", "G", 5, "2027-01-01").await;
    may.service
        .dispense(&med("PARA500"), 60, None, &staff())
        .await
        .unwrap();
    may.service
        .dispense(&med("AMOX250"), 10, None, &staff())
        .await
        .unwrap();

    let june = InventoryService::new(
        may.store.clone(),
        Arc::new(FixedClock::on(date("2025-06-15"))),
        InventorySettings::default(),
    );
    june.receive(
        ReceiveInput {
            medicine_id: med("AMOX250"),
            lot_code: lot("Y"),
            quantity: 500,
            mfg_date: None,
            exp_date: date("2027-06-01"),
            note: None,
        },
        &staff(),
    )
    .await
    .unwrap();

    (may, june)
}

#[tokio::test]
async fn test_monthly_report_covers_previous_month_only() {
    let (_may, june) = may_scenario().await;

    let report = june.monthly_report(None).await.unwrap();

    assert_eq!(report.month, ReportMonth { year: 2025, month: 5 });
    assert_eq!(report.generated_on, date("2025-06-15"));
    assert_eq!(report.drug_count, 2);
    assert_eq!(report.supply_count, 1);

    let received: Vec<(&str, i64)> = report
        .top_received
        .iter()
        .map(|m| (m.medicine_id.as_str(), m.quantity))
        .collect();
    assert_eq!(received, [("PARA500", 100), ("AMOX250", 30), ("GAUZE", 5)]);

    let dispensed: Vec<(&str, i64)> = report
        .top_dispensed
        .iter()
        .map(|m| (m.medicine_id.as_str(), m.quantity))
        .collect();
    assert_eq!(dispensed, [("PARA500", 60), ("AMOX250", 10)]);

    assert_eq!(report.low_stock_drugs, 1);
    assert_eq!(report.low_stock_supplies, 1);
    assert_eq!(report.near_expiry.len(), 1);
    assert_eq!(report.near_expiry[0].lot_code.as_str(), "A");
}

#[tokio::test]
async fn test_monthly_report_for_an_explicit_month() {
    let (_may, june) = may_scenario().await;

    let report = june
        .monthly_report(Some(ReportMonth::parse("2025-06").unwrap()))
        .await
        .unwrap();
    let text = june
        .monthly_report_text(Some(ReportMonth::parse("2025-05").unwrap()))
        .await
        .unwrap();

    assert_eq!(report.top_received.len(), 1);
    assert_eq!(report.top_received[0].quantity, 500);
    assert!(report.top_dispensed.is_empty());
    assert!(text.starts_with("Monthly stock report: May 2025"));
}

#[tokio::test]
async fn test_low_stock_ignores_inactive_medicines() {
    let (_may, june) = may_scenario().await;

    let low = june.low_stock_report().await.unwrap();

    let ids: Vec<&str> = low.iter().map(|i| i.medicine_id.as_str()).collect();
    assert_eq!(ids, ["GAUZE", "PARA500"]);
    assert_eq!(low[1].remaining, 40);
    assert_eq!(low[1].threshold, 50);
}

#[tokio::test]
async fn test_near_expiry_horizon() {
    let (_may, june) = may_scenario().await;

    let default_horizon = june.near_expiry_report(None).await.unwrap();
    let short = june.near_expiry_report(Some(30)).await.unwrap();
    let long = june.near_expiry_report(Some(400)).await.unwrap();

    assert_eq!(default_horizon.len(), 1);
    assert_eq!(default_horizon[0].days_left, 47);
    assert!(short.is_empty());
    let lots: Vec<&str> = long.iter().map(|i| i.lot_code.as_str()).collect();
    assert_eq!(lots, ["A", "X"]);
}

#[tokio::test]
async fn test_stock_summary() {
    let (_may, june) = may_scenario().await;

    let summary = june.stock_summary().await.unwrap();

    assert_eq!(summary.as_of, date("2025-06-15"));
    assert_eq!(summary.medicines_in_stock, 3);
    assert_eq!(summary.total_units, 40 + 20 + 500 + 5);
    assert_eq!(summary.near_expiry_lots, 1);
    assert_eq!(summary.horizon_days, 180);
    let amox = summary
        .items
        .iter()
        .find(|i| i.medicine_id.as_str() == "AMOX250")
        .unwrap();
    assert_eq!(amox.quantity, 520);
    assert_eq!(amox.lot_count, 2);
}

#[tokio::test]
async fn test_audit_finds_drift_and_orphaned_entries() {
    let (may, june) = may_scenario().await;
    may.assert_balanced().await;

    may.store
        .force_lot_quantity(&med("GAUZE"), &lot("G"), 9)
        .await
        .unwrap();
    let found = june.audit_ledger().await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].medicine_id.as_str(), "GAUZE");
    assert_eq!(found[0].lot_quantity, Some(9));
    assert_eq!(found[0].ledger_sum, 5);
}
