//! First-expired-first-out dispensing against the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use clinic_stock_integration_tests::{TestContext, med, staff};
use clinic_stock_server::models::{DispenseLine, DispenseRequest};
use clinic_stock_server::services::InventoryError;

fn line(id: &str, quantity: i64) -> DispenseLine {
    DispenseLine {
        medicine_id: med(id),
        quantity,
    }
}

#[tokio::test]
async fn test_dispense_fifteen_from_two_lots_of_ten() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "B", 10, "2026-01-01").await;
    ctx.receive("PARA500", "A", 10, "2025-10-01").await;

    let outcome = ctx
        .service
        .dispense(&med("PARA500"), 15, None, &staff())
        .await
        .unwrap();

    let taken: Vec<(&str, i64)> = outcome
        .plan
        .lines
        .iter()
        .map(|l| (l.lot_code.as_str(), l.quantity))
        .collect();
    assert_eq!(taken, [("A", 10), ("B", 5)]);
    assert_eq!(outcome.plan.total(), 15);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 0);
    assert_eq!(ctx.lot_quantity("PARA500", "B").await, 5);
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_same_expiry_breaks_ties_by_lot_code() {
    let ctx = TestContext::new();
    ctx.medicine("AMOX250", 0).await;
    ctx.receive("AMOX250", "L-20", 4, "2025-12-31").await;
    ctx.receive("AMOX250", "L-10", 4, "2025-12-31").await;

    let outcome = ctx
        .service
        .dispense(&med("AMOX250"), 6, None, &staff())
        .await
        .unwrap();

    assert_eq!(outcome.transactions[0].lot_code.as_str(), "L-10");
    assert_eq!(outcome.transactions[0].delta, -4);
    assert_eq!(outcome.transactions[1].lot_code.as_str(), "L-20");
    assert_eq!(outcome.transactions[1].delta, -2);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_snapshot_untouched() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "A", 5, "2025-10-01").await;
    let lots_before = ctx.lots("PARA500").await;
    let ledger_before = ctx
        .service
        .transactions_for_medicine(&med("PARA500"))
        .await
        .unwrap();

    let err = ctx
        .service
        .dispense(&med("PARA500"), 10, None, &staff())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::InsufficientStock {
            requested: 10,
            available: 5,
            ..
        }
    ));
    assert_eq!(ctx.lots("PARA500").await, lots_before);
    assert_eq!(
        ctx.service
            .transactions_for_medicine(&med("PARA500"))
            .await
            .unwrap(),
        ledger_before
    );
}

#[tokio::test]
async fn test_dispense_exactly_to_zero() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "A", 7, "2025-10-01").await;

    ctx.service
        .dispense(&med("PARA500"), 7, None, &staff())
        .await
        .unwrap();

    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 0);
    assert!(
        ctx.service
            .available_lots(&med("PARA500"))
            .await
            .unwrap()
            .is_empty()
    );
    let err = ctx
        .service
        .dispense(&med("PARA500"), 1, None, &staff())
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InsufficientStock { available: 0, .. }));
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.medicine("AMOX250", 0).await;
    ctx.receive("PARA500", "A", 10, "2025-10-01").await;
    ctx.receive("AMOX250", "X", 3, "2025-11-01").await;

    let err = ctx
        .service
        .dispense_batch(
            DispenseRequest {
                lines: vec![line("PARA500", 5), line("AMOX250", 4)],
                note: None,
            },
            &staff(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InventoryError::InsufficientStock { .. }));
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 10);
    assert_eq!(ctx.lot_quantity("AMOX250", "X").await, 3);
}

#[tokio::test]
async fn test_batch_lines_for_same_medicine_are_cumulative() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "A", 6, "2025-10-01").await;
    ctx.receive("PARA500", "B", 6, "2025-12-01").await;

    let outcome = ctx
        .service
        .dispense_batch(
            DispenseRequest {
                lines: vec![line("PARA500", 4), line("PARA500", 4)],
                note: Some("two prescriptions".to_owned()),
            },
            &staff(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.lines.len(), 2);
    assert_eq!(outcome.lines[0].transactions.len(), 1);
    assert_eq!(outcome.lines[1].transactions.len(), 2);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 0);
    assert_eq!(ctx.lot_quantity("PARA500", "B").await, 4);

    let over = ctx
        .service
        .dispense_batch(
            DispenseRequest {
                lines: vec![line("PARA500", 3), line("PARA500", 2)],
                note: None,
            },
            &staff(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        over,
        InventoryError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_empty_batch_is_invalid() {
    let ctx = TestContext::new();

    let err = ctx
        .service
        .dispense_batch(
            DispenseRequest {
                lines: vec![],
                note: None,
            },
            &staff(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, InventoryError::InvalidInput(_)));
}
