//! Ledger commands: history, edit, delete.

use tracing::info;

use clinic_stock_core::{MedicineId, TransactionId};
use clinic_stock_server::models::{EditTransactionInput, RequestContext};
use clinic_stock_server::services::InventoryService;

use super::CliError;

/// Print a medicine's ledger with the running balance.
///
/// # Errors
///
/// Returns an error if the medicine is unknown.
pub async fn history(service: &InventoryService, medicine_id: &MedicineId) -> Result<(), CliError> {
    let lines = service.ledger_history(medicine_id).await?;

    #[allow(clippy::print_stdout)]
    for line in &lines {
        let tx = &line.transaction;
        println!(
            "{:>6}  {}  {:<9} {:<16} {:>7} {:>8}  {}{}",
            tx.id,
            tx.created_at.format("%Y-%m-%d %H:%M"),
            tx.kind.as_str(),
            tx.lot_code.as_str(),
            tx.delta,
            line.running_balance,
            tx.actor,
            tx.note.as_deref().map(|n| format!("  {n}")).unwrap_or_default()
        );
    }
    Ok(())
}

/// Edit an entry's quantity and/or note.
///
/// # Errors
///
/// Returns an error if the entry is unknown, belongs to someone else, or the
/// lot cannot absorb the change.
pub async fn edit(
    service: &InventoryService,
    id: i64,
    quantity: Option<i64>,
    note: Option<String>,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let updated = service
        .edit_transaction(TransactionId::new(id), EditTransactionInput { quantity, note }, ctx)
        .await?;

    info!(transaction_id = %updated.id, delta = updated.delta, "Entry updated");
    Ok(())
}

/// Delete an entry.
///
/// # Errors
///
/// Returns an error if the entry is unknown, belongs to someone else, or the
/// reversal would leave its lot below zero.
pub async fn delete(service: &InventoryService, id: i64, ctx: &RequestContext) -> Result<(), CliError> {
    let deleted = service.delete_transaction(TransactionId::new(id), ctx).await?;

    info!(
        transaction_id = %deleted.id,
        medicine_id = %deleted.medicine_id,
        delta = deleted.delta,
        "Entry deleted"
    );
    Ok(())
}
