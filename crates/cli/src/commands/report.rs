//! Report commands.

use clinic_stock_server::models::ReportMonth;
use clinic_stock_server::services::InventoryService;

use super::CliError;

/// Print medicines at or below their reorder point.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn low_stock(service: &InventoryService) -> Result<(), CliError> {
    let items = service.low_stock_report().await?;

    #[allow(clippy::print_stdout)]
    {
        if items.is_empty() {
            println!("Nothing at or below its reorder point.");
        }
        for item in &items {
            println!(
                "{:<12} {:<32} {:>6} / {:<6} {}",
                item.medicine_id.as_str(),
                item.name,
                item.remaining,
                item.threshold,
                item.unit
            );
        }
    }
    Ok(())
}

/// Print lots expiring within the horizon.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn near_expiry(service: &InventoryService, days: Option<u32>) -> Result<(), CliError> {
    let items = service.near_expiry_report(days).await?;

    #[allow(clippy::print_stdout)]
    {
        if items.is_empty() {
            println!("No lots near expiry.");
        }
        for item in &items {
            println!(
                "{}  {:>5}d  {:<12} {:<16} {:>6} {}",
                item.exp_date,
                item.days_left,
                item.medicine_id.as_str(),
                item.lot_code.as_str(),
                item.remaining,
                item.unit.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

/// Print the dashboard summary.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn summary(service: &InventoryService) -> Result<(), CliError> {
    let summary = service.stock_summary().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Stock as of {}", summary.as_of);
        println!("Medicines in stock: {}", summary.medicines_in_stock);
        println!("Total units: {}", summary.total_units);
        println!(
            "Lots expiring within {} days: {}",
            summary.horizon_days, summary.near_expiry_lots
        );
        for item in &summary.items {
            println!(
                "  {:<12} {:<32} {:>8} {} ({} lots)",
                item.medicine_id.as_str(),
                item.name,
                item.quantity,
                item.unit,
                item.lot_count
            );
        }
    }
    Ok(())
}

/// Print the monthly report as text or JSON.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn monthly(
    service: &InventoryService,
    month: Option<ReportMonth>,
    json: bool,
) -> Result<(), CliError> {
    let output = if json {
        serde_json::to_string_pretty(&service.monthly_report(month).await?)?
    } else {
        service.monthly_report_text(month).await?
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}

/// Print lots whose quantity disagrees with their ledger.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn audit(service: &InventoryService) -> Result<(), CliError> {
    let discrepancies = service.audit_ledger().await?;

    #[allow(clippy::print_stdout)]
    {
        if discrepancies.is_empty() {
            println!("Every lot matches its ledger.");
        }
        for d in &discrepancies {
            println!(
                "{:<12} {:<16} lot {:>8} ledger {:>8}",
                d.medicine_id.as_str(),
                d.lot_code.as_str(),
                d.lot_quantity
                    .map_or_else(|| "missing".to_owned(), |q| q.to_string()),
                d.ledger_sum
            );
        }
    }
    Ok(())
}
