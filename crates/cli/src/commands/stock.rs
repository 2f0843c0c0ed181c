//! Stock movement commands: receive, opening balance, dispense.

use chrono::NaiveDate;
use tracing::info;

use clinic_stock_core::{LotCode, MedicineId};
use clinic_stock_server::models::{
    DispenseLine, DispenseRequest, OpeningBalanceInput, ReceiveInput, RequestContext,
};
use clinic_stock_server::services::InventoryService;

use super::CliError;

/// Lot and quantity given on the command line.
#[derive(Debug, Clone)]
pub struct LotEntry {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    pub quantity: i64,
    pub mfg_date: Option<NaiveDate>,
    pub exp_date: NaiveDate,
    pub note: Option<String>,
}

/// Parse a `MEDICINE:QUANTITY` dispense line.
///
/// # Errors
///
/// Returns a message if the separator is missing, the code is invalid or
/// the quantity is not a positive whole number.
pub fn parse_dispense_line(s: &str) -> Result<(MedicineId, i64), String> {
    let (code, quantity) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected MEDICINE:QUANTITY, got `{s}`"))?;
    let medicine_id = MedicineId::parse(code).map_err(|e| e.to_string())?;
    let quantity: i64 = quantity
        .trim()
        .parse()
        .map_err(|_| format!("invalid quantity in `{s}`"))?;
    if quantity <= 0 {
        return Err(format!("quantity must be positive in `{s}`"));
    }
    Ok((medicine_id, quantity))
}

/// Receive a delivery.
///
/// # Errors
///
/// Returns an error if the receipt is rejected.
pub async fn receive(
    service: &InventoryService,
    entry: LotEntry,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let outcome = service
        .receive(
            ReceiveInput {
                medicine_id: entry.medicine_id,
                lot_code: entry.lot_code,
                quantity: entry.quantity,
                mfg_date: entry.mfg_date,
                exp_date: entry.exp_date,
                note: entry.note,
            },
            ctx,
        )
        .await?;

    info!(
        transaction_id = %outcome.transaction.id,
        lot_quantity = outcome.lot.quantity,
        "Received"
    );
    Ok(())
}

/// Record an opening balance.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the balance is rejected.
pub async fn opening_balance(
    service: &InventoryService,
    entry: LotEntry,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let outcome = service
        .record_opening_balance(
            OpeningBalanceInput {
                medicine_id: entry.medicine_id,
                lot_code: entry.lot_code,
                quantity: entry.quantity,
                mfg_date: entry.mfg_date,
                exp_date: entry.exp_date,
                note: entry.note,
            },
            ctx,
        )
        .await?;

    info!(
        transaction_id = %outcome.transaction.id,
        lot_quantity = outcome.lot.quantity,
        "Opening balance recorded"
    );
    Ok(())
}

/// Dispense one or more lines and print which lots were used.
///
/// # Errors
///
/// Returns an error if any line cannot be met; nothing is dispensed then.
pub async fn dispense(
    service: &InventoryService,
    lines: Vec<(MedicineId, i64)>,
    note: Option<String>,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let request = DispenseRequest {
        lines: lines
            .into_iter()
            .map(|(medicine_id, quantity)| DispenseLine {
                medicine_id,
                quantity,
            })
            .collect(),
        note,
    };

    let outcome = service.dispense_batch(request, ctx).await?;

    #[allow(clippy::print_stdout)]
    for line in &outcome.lines {
        println!("{} x{}", line.plan.medicine_id, line.plan.requested);
        for tx in &line.transactions {
            println!("  lot {:<16} {:>6}  (entry {})", tx.lot_code.as_str(), -tx.delta, tx.id);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dispense_line() {
        let (id, quantity) = parse_dispense_line("PARA500:20").unwrap();
        assert_eq!(id.as_str(), "PARA500");
        assert_eq!(quantity, 20);

        assert!(parse_dispense_line("PARA500").is_err());
        assert!(parse_dispense_line("PARA500:0").is_err());
        assert!(parse_dispense_line("PARA500:-3").is_err());
        assert!(parse_dispense_line(":5").is_err());
    }
}
