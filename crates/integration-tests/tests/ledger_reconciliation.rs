//! Edits and deletes of historical ledger entries keep every lot equal to
//! the sum of its ledger deltas.

#![allow(clippy::unwrap_used)]

use clinic_stock_core::ReconciliationError;
use clinic_stock_integration_tests::{TestContext, admin, date, lot, med, staff};
use clinic_stock_server::models::{EditTransactionInput, OpeningBalanceInput, RequestContext};
use clinic_stock_server::services::InventoryError;

fn quantity(q: i64) -> EditTransactionInput {
    EditTransactionInput {
        quantity: Some(q),
        note: None,
    }
}

#[tokio::test]
async fn test_shrinking_a_receipt_with_stock_on_hand() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let received = ctx.receive("PARA500", "A", 20, "2026-01-01").await;

    let edited = ctx
        .service
        .edit_transaction(received.transaction.id, quantity(15), &staff())
        .await
        .unwrap();

    assert_eq!(edited.delta, 15);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 15);
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_shrinking_a_receipt_after_partial_dispense_applies_the_difference() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let received = ctx.receive("PARA500", "A", 20, "2026-01-01").await;
    ctx.service
        .dispense(&med("PARA500"), 10, None, &staff())
        .await
        .unwrap();
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 10);

    let edited = ctx
        .service
        .edit_transaction(received.transaction.id, quantity(15), &staff())
        .await
        .unwrap();

    // 20 -> 15 takes 5 back out of the 10 left on the shelf.
    assert_eq!(edited.delta, 15);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 5);
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_shrinking_a_receipt_after_dispensing_is_refused() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let received = ctx.receive("PARA500", "A", 20, "2026-01-01").await;
    ctx.service
        .dispense(&med("PARA500"), 18, None, &staff())
        .await
        .unwrap();

    let err = ctx
        .service
        .edit_transaction(received.transaction.id, quantity(15), &staff())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::Reconciliation(ReconciliationError::WouldGoNegative {
            current: 2,
            change: -5,
            resulting: -3,
            ..
        })
    ));
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 2);
    let unchanged = ctx
        .service
        .get_transaction(received.transaction.id)
        .await
        .unwrap();
    assert_eq!(unchanged.delta, 20);
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_delete_receipt_blocked_after_full_dispense() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let received = ctx.receive("PARA500", "A", 10, "2026-01-01").await;
    ctx.service
        .dispense(&med("PARA500"), 10, None, &staff())
        .await
        .unwrap();

    let err = ctx
        .service
        .delete_transaction(received.transaction.id, &staff())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::Reconciliation(ReconciliationError::WouldGoNegative { .. })
    ));
    assert!(ctx.service.get_transaction(received.transaction.id).await.is_ok());
}

#[tokio::test]
async fn test_receive_then_delete_round_trip() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "A", 8, "2026-01-01").await;
    let second = ctx.receive("PARA500", "B", 12, "2026-02-01").await;

    let deleted = ctx
        .service
        .delete_transaction(second.transaction.id, &staff())
        .await
        .unwrap();

    assert_eq!(deleted, second.transaction);
    assert_eq!(ctx.lot_quantity("PARA500", "B").await, 0);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 8);
    assert!(matches!(
        ctx.service
            .get_transaction(second.transaction.id)
            .await
            .unwrap_err(),
        InventoryError::NotFound(_)
    ));
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_editing_a_dispense_moves_the_lot() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    ctx.receive("PARA500", "A", 10, "2026-01-01").await;
    let dispensed = ctx
        .service
        .dispense(&med("PARA500"), 4, None, &staff())
        .await
        .unwrap();
    let entry = dispensed.transactions[0].clone();

    let grown = ctx
        .service
        .edit_transaction(entry.id, quantity(9), &staff())
        .await
        .unwrap();
    assert_eq!(grown.delta, -9);
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 1);

    let too_much = ctx
        .service
        .edit_transaction(entry.id, quantity(12), &staff())
        .await
        .unwrap_err();
    assert!(matches!(too_much, InventoryError::Reconciliation(_)));

    ctx.service.delete_transaction(entry.id, &staff()).await.unwrap();
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 10);
    ctx.assert_balanced().await;
}

#[tokio::test]
async fn test_entries_without_a_lot_row() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let ghost = clinic_stock_server::models::Transaction {
        id: clinic_stock_core::TransactionId::new(900),
        medicine_id: med("PARA500"),
        lot_code: lot("LEGACY"),
        delta: -3,
        kind: clinic_stock_core::TransactionKind::Dispense,
        actor: "nurse@clinic.test".to_owned(),
        note: None,
        created_at: date("2024-01-01").and_hms_opt(9, 0, 0).unwrap().and_utc(),
    };
    ctx.store.insert_raw_transaction(ghost.clone()).await;

    let err = ctx
        .service
        .delete_transaction(ghost.id, &admin())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::Reconciliation(ReconciliationError::MissingLot { change: 3, .. })
    ));
}

#[tokio::test]
async fn test_opening_balance_accepts_note_changes_only() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let opening = ctx
        .service
        .record_opening_balance(
            OpeningBalanceInput {
                medicine_id: med("PARA500"),
                lot_code: lot("OLD"),
                quantity: 40,
                mfg_date: None,
                exp_date: date("2026-06-30"),
                note: None,
            },
            &admin(),
        )
        .await
        .unwrap();

    let same = ctx
        .service
        .edit_transaction(
            opening.transaction.id,
            EditTransactionInput {
                quantity: Some(40),
                note: Some("stock card carried over".to_owned()),
            },
            &admin(),
        )
        .await
        .unwrap();
    let changed = ctx
        .service
        .edit_transaction(opening.transaction.id, quantity(35), &admin())
        .await
        .unwrap_err();

    assert_eq!(same.note.as_deref(), Some("stock card carried over"));
    assert!(matches!(
        changed,
        InventoryError::Reconciliation(ReconciliationError::InitialBalanceLocked)
    ));
    assert_eq!(ctx.lot_quantity("PARA500", "OLD").await, 40);
}

#[tokio::test]
async fn test_staff_may_only_correct_their_own_entries() {
    let ctx = TestContext::new();
    ctx.medicine("PARA500", 0).await;
    let received = ctx.receive("PARA500", "A", 10, "2026-01-01").await;
    let colleague = RequestContext::staff("pharmacist@clinic.test");

    let err = ctx
        .service
        .edit_transaction(received.transaction.id, quantity(9), &colleague)
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::Permission(_)));

    ctx.service
        .edit_transaction(received.transaction.id, quantity(9), &admin())
        .await
        .unwrap();
    assert_eq!(ctx.lot_quantity("PARA500", "A").await, 9);
}
