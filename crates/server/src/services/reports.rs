//! Report builders.
//!
//! Everything here is a pure function over rows already loaded by the
//! service, so the same logic serves the JSON API, the CLI and the tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{Days, NaiveDate};

use clinic_stock_core::{LotCode, MedicineId, TransactionKind};

use crate::models::{
    AuditDiscrepancy, LowStockItem, Lot, Medicine, MonthlyReport, MovementItem, NearExpiryItem,
    ReportMonth, StockSummary, StockSummaryItem, Transaction,
};

/// Last date covered by a horizon of `days` starting `today`.
#[must_use]
pub fn horizon_end(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Units on hand per medicine.
#[must_use]
pub fn stock_by_medicine(lots: &[Lot]) -> HashMap<&MedicineId, i64> {
    let mut totals: HashMap<&MedicineId, i64> = HashMap::new();
    for lot in lots {
        *totals.entry(&lot.medicine_id).or_default() += lot.quantity;
    }
    totals
}

fn index_by_id(medicines: &[Medicine]) -> HashMap<&MedicineId, &Medicine> {
    medicines.iter().map(|m| (&m.id, m)).collect()
}

/// Active medicines whose stock is at or below their reorder point.
///
/// A medicine with no lots counts as holding zero units.
#[must_use]
pub fn low_stock(medicines: &[Medicine], lots: &[Lot]) -> Vec<LowStockItem> {
    let totals = stock_by_medicine(lots);

    medicines
        .iter()
        .filter(|m| m.is_active)
        .filter_map(|m| {
            let remaining = totals.get(&m.id).copied().unwrap_or(0);
            (remaining <= m.min_stock).then(|| LowStockItem {
                medicine_id: m.id.clone(),
                name: m.name.clone(),
                unit: m.unit.clone(),
                category: m.category,
                remaining,
                threshold: m.min_stock,
            })
        })
        .collect()
}

/// Lots with stock that expire on or before `today + horizon_days`.
///
/// Already expired lots are included. Sorted by expiry date, then medicine,
/// then lot code.
#[must_use]
pub fn near_expiry(
    medicines: &[Medicine],
    lots: &[Lot],
    today: NaiveDate,
    horizon_days: u32,
) -> Vec<NearExpiryItem> {
    let by_id = index_by_id(medicines);
    let cutoff = horizon_end(today, horizon_days);

    let mut items: Vec<NearExpiryItem> = lots
        .iter()
        .filter(|lot| lot.quantity > 0 && lot.expires_by(cutoff))
        .map(|lot| {
            let medicine = by_id.get(&lot.medicine_id);
            NearExpiryItem {
                medicine_id: lot.medicine_id.clone(),
                name: medicine.map(|m| m.name.clone()),
                unit: medicine.map(|m| m.unit.clone()),
                lot_code: lot.lot_code.clone(),
                remaining: lot.quantity,
                exp_date: lot.exp_date,
                days_left: (lot.exp_date - today).num_days(),
            }
        })
        .collect();

    items.sort_by(|a, b| {
        a.exp_date
            .cmp(&b.exp_date)
            .then_with(|| a.medicine_id.cmp(&b.medicine_id))
            .then_with(|| a.lot_code.cmp(&b.lot_code))
    });
    items
}

/// Dashboard overview of everything currently on the shelf.
#[must_use]
pub fn stock_summary(
    medicines: &[Medicine],
    lots: &[Lot],
    today: NaiveDate,
    horizon_days: u32,
) -> StockSummary {
    let by_id = index_by_id(medicines);
    let cutoff = horizon_end(today, horizon_days);
    let mut per_medicine: BTreeMap<&MedicineId, (i64, usize)> = BTreeMap::new();
    let mut near_expiry_lots = 0;

    for lot in lots.iter().filter(|lot| lot.quantity > 0) {
        let entry = per_medicine.entry(&lot.medicine_id).or_default();
        entry.0 += lot.quantity;
        entry.1 += 1;
        if lot.expires_by(cutoff) {
            near_expiry_lots += 1;
        }
    }

    let mut items: Vec<StockSummaryItem> = per_medicine
        .into_iter()
        .map(|(id, (quantity, lot_count))| {
            let medicine = by_id.get(id);
            StockSummaryItem {
                medicine_id: id.clone(),
                name: medicine.map_or_else(|| id.to_string(), |m| m.name.clone()),
                unit: medicine.map(|m| m.unit.clone()).unwrap_or_default(),
                quantity,
                lot_count,
            }
        })
        .collect();
    items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.medicine_id.cmp(&b.medicine_id)));

    StockSummary {
        as_of: today,
        medicines_in_stock: items.len(),
        total_units: items.iter().map(|item| item.quantity).sum(),
        near_expiry_lots,
        horizon_days,
        items,
    }
}

/// Medicines with the most units moved by entries of `kind`, largest first.
///
/// Ties are broken by medicine ID. At most `limit` items are returned.
#[must_use]
pub fn top_movements(
    medicines: &[Medicine],
    transactions: &[Transaction],
    kind: TransactionKind,
    limit: usize,
) -> Vec<MovementItem> {
    let by_id = index_by_id(medicines);
    let mut totals: BTreeMap<&MedicineId, i64> = BTreeMap::new();

    for transaction in transactions.iter().filter(|t| t.kind == kind) {
        *totals.entry(&transaction.medicine_id).or_default() += transaction.delta.abs();
    }

    let mut ranked: Vec<(&MedicineId, i64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(id, quantity)| {
            let medicine = by_id.get(id);
            MovementItem {
                medicine_id: id.clone(),
                name: medicine.map_or_else(|| id.to_string(), |m| m.name.clone()),
                unit: medicine.map(|m| m.unit.clone()).unwrap_or_default(),
                quantity,
            }
        })
        .collect()
}

/// Inputs to [`monthly_report`].
#[derive(Debug, Clone, Copy)]
pub struct MonthlyReportInput<'a> {
    pub month: ReportMonth,
    pub today: NaiveDate,
    /// Every medicine, active or not.
    pub medicines: &'a [Medicine],
    pub lots: &'a [Lot],
    /// Entries recorded during `month`.
    pub transactions: &'a [Transaction],
    pub top_n: usize,
    pub near_expiry_days: u32,
}

/// Build the monthly report.
///
/// Movement figures cover the requested month; the master-list counts, low
/// stock and near-expiry sections describe stock as of `today`.
#[must_use]
pub fn monthly_report(input: MonthlyReportInput<'_>) -> MonthlyReport {
    let active: Vec<&Medicine> = input.medicines.iter().filter(|m| m.is_active).collect();
    let drug_count = active.iter().filter(|m| m.category.is_drug()).count();

    let low_stock = low_stock(input.medicines, input.lots);
    let low_stock_drugs = low_stock.iter().filter(|i| i.category.is_drug()).count();

    MonthlyReport {
        month: input.month,
        generated_on: input.today,
        drug_count,
        supply_count: active.len() - drug_count,
        top_received: top_movements(
            input.medicines,
            input.transactions,
            TransactionKind::Receive,
            input.top_n,
        ),
        top_dispensed: top_movements(
            input.medicines,
            input.transactions,
            TransactionKind::Dispense,
            input.top_n,
        ),
        low_stock_supplies: low_stock.len() - low_stock_drugs,
        low_stock_drugs,
        low_stock,
        near_expiry: near_expiry(
            input.medicines,
            input.lots,
            input.today,
            input.near_expiry_days,
        ),
        near_expiry_days: input.near_expiry_days,
    }
}

/// Compare each lot with the signed sum of its ledger entries.
///
/// Pairs that only appear in the ledger are reported when their sum is not
/// zero. Sorted by medicine, then lot code.
#[must_use]
pub fn audit(lots: &[Lot], transactions: &[Transaction]) -> Vec<AuditDiscrepancy> {
    let mut pairs: BTreeMap<(&MedicineId, &LotCode), (Option<i64>, i64)> = BTreeMap::new();

    for lot in lots {
        pairs.entry((&lot.medicine_id, &lot.lot_code)).or_default().0 = Some(lot.quantity);
    }
    for transaction in transactions {
        pairs
            .entry((&transaction.medicine_id, &transaction.lot_code))
            .or_default()
            .1 += transaction.delta;
    }

    pairs
        .into_iter()
        .filter(|(_, (lot_quantity, ledger_sum))| lot_quantity.unwrap_or(0) != *ledger_sum)
        .map(|((medicine_id, lot_code), (lot_quantity, ledger_sum))| AuditDiscrepancy {
            medicine_id: medicine_id.clone(),
            lot_code: lot_code.clone(),
            lot_quantity,
            ledger_sum,
        })
        .collect()
}

/// Render the monthly report as plain text for posting to a chat channel.
///
/// Each list section shows at most `list_limit` items followed by an
/// "...and N more" line.
#[must_use]
pub fn render_monthly_report(report: &MonthlyReport, list_limit: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Monthly stock report: {} {}",
        report.month.month_name(),
        report.month.year
    );
    let _ = writeln!(out, "Generated {}", report.generated_on);

    let _ = write!(
        out,
        "\nOn the master list:\n- Drugs: {} items\n- Supplies: {} items\n",
        report.drug_count, report.supply_count
    );

    render_movements(&mut out, "received", "+", "(no receipts)", &report.top_received);
    render_movements(&mut out, "dispensed", "-", "(no dispensing)", &report.top_dispensed);

    let _ = write!(
        out,
        "\nAt or below reorder point: {} items\n- Drugs: {} items\n- Supplies: {} items\n",
        report.low_stock.len(),
        report.low_stock_drugs,
        report.low_stock_supplies
    );
    if report.low_stock.is_empty() {
        out.push_str("All items are above their reorder point.\n");
    } else {
        for item in report.low_stock.iter().take(list_limit) {
            let _ = writeln!(
                out,
                "- {}: {} left (reorder at {})",
                item.name, item.remaining, item.threshold
            );
        }
        render_more(&mut out, report.low_stock.len(), list_limit, "items");
    }

    let _ = write!(
        out,
        "\nExpiring within {} days: {} lots\n",
        report.near_expiry_days,
        report.near_expiry.len()
    );
    if report.near_expiry.is_empty() {
        out.push_str("No lots near expiry.\n");
    } else {
        for item in report.near_expiry.iter().take(list_limit) {
            let name = item.name.as_deref().unwrap_or(item.medicine_id.as_str());
            let _ = writeln!(
                out,
                "- {name} lot {}: {} left, expires {}",
                item.lot_code,
                item.remaining,
                item.exp_date.format("%d/%m/%Y")
            );
        }
        render_more(&mut out, report.near_expiry.len(), list_limit, "lots");
    }

    out
}

fn render_movements(
    out: &mut String,
    label: &str,
    sign: &str,
    empty: &str,
    items: &[MovementItem],
) {
    let _ = writeln!(out, "\nTop {label}:");
    if items.is_empty() {
        let _ = writeln!(out, "{empty}");
        return;
    }
    for (rank, item) in items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({sign}{} {})",
            rank + 1,
            item.name,
            item.quantity,
            item.unit
        );
    }
}

fn render_more(out: &mut String, total: usize, limit: usize, noun: &str) {
    if total > limit {
        let _ = writeln!(out, "...and {} more {noun}", total - limit);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{DateTime, Utc};

    use clinic_stock_core::{MedicineCategory, TransactionId};

    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn timestamp() -> DateTime<Utc> {
        "2025-06-15T09:00:00Z".parse().unwrap()
    }

    fn medicine(id: &str, category: MedicineCategory, min_stock: i64) -> Medicine {
        Medicine {
            id: MedicineId::parse(id).unwrap(),
            name: format!("{id} name"),
            unit: "tablet".to_owned(),
            category,
            min_stock,
            is_active: true,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    fn lot(medicine_id: &str, code: &str, quantity: i64, exp: &str) -> Lot {
        Lot {
            medicine_id: MedicineId::parse(medicine_id).unwrap(),
            lot_code: LotCode::parse(code).unwrap(),
            quantity,
            mfg_date: None,
            exp_date: date(exp),
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    fn entry(id: i64, medicine_id: &str, code: &str, delta: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            medicine_id: MedicineId::parse(medicine_id).unwrap(),
            lot_code: LotCode::parse(code).unwrap(),
            delta,
            kind: if delta > 0 {
                TransactionKind::Receive
            } else {
                TransactionKind::Dispense
            },
            actor: "nurse@clinic.test".to_owned(),
            note: None,
            created_at: timestamp(),
        }
    }

    #[test]
    fn test_low_stock_includes_threshold_and_empty_medicines() {
        let medicines = vec![
            medicine("A", MedicineCategory::EssentialDrug, 10),
            medicine("B", MedicineCategory::MedicalSupply, 5),
            medicine("C", MedicineCategory::EssentialDrug, 1),
        ];
        let lots = vec![lot("A", "L1", 10, "2026-01-01"), lot("C", "L1", 50, "2026-01-01")];

        let items = low_stock(&medicines, &lots);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].medicine_id.as_str(), "A");
        assert_eq!(items[0].remaining, 10);
        assert_eq!(items[1].medicine_id.as_str(), "B");
        assert_eq!(items[1].remaining, 0);
    }

    #[test]
    fn test_low_stock_skips_inactive_medicines() {
        let mut inactive = medicine("A", MedicineCategory::EssentialDrug, 10);
        inactive.is_active = false;

        assert!(low_stock(&[inactive], &[]).is_empty());
    }

    #[test]
    fn test_near_expiry_horizon_is_inclusive() {
        let today = date("2025-06-01");
        let lots = vec![
            lot("A", "EDGE", 1, "2025-08-30"),
            lot("A", "LATE", 1, "2025-08-31"),
            lot("A", "GONE", 3, "2025-05-01"),
            lot("A", "EMPTY", 0, "2025-06-02"),
        ];

        let items = near_expiry(&[], &lots, today, 90);

        let codes: Vec<&str> = items.iter().map(|i| i.lot_code.as_str()).collect();
        assert_eq!(codes, ["GONE", "EDGE"]);
        assert_eq!(items[0].days_left, -31);
        assert!(items[0].name.is_none());
    }

    #[test]
    fn test_stock_summary_counts() {
        let medicines = vec![medicine("A", MedicineCategory::EssentialDrug, 0)];
        let lots = vec![
            lot("A", "L1", 4, "2025-07-01"),
            lot("A", "L2", 6, "2027-01-01"),
            lot("B", "L1", 0, "2025-07-01"),
        ];

        let summary = stock_summary(&medicines, &lots, date("2025-06-01"), 180);

        assert_eq!(summary.medicines_in_stock, 1);
        assert_eq!(summary.total_units, 10);
        assert_eq!(summary.near_expiry_lots, 1);
        assert_eq!(summary.items[0].lot_count, 2);
        assert_eq!(summary.items[0].name, "A name");
    }

    #[test]
    fn test_top_movements_ranks_and_limits() {
        let transactions = vec![
            entry(1, "A", "L1", 10),
            entry(2, "B", "L1", 30),
            entry(3, "A", "L2", 25),
            entry(4, "C", "L1", 5),
            entry(5, "A", "L1", -7),
        ];

        let received = top_movements(&[], &transactions, TransactionKind::Receive, 2);
        let dispensed = top_movements(&[], &transactions, TransactionKind::Dispense, 5);

        assert_eq!(received.len(), 2);
        assert_eq!(received[0].medicine_id.as_str(), "A");
        assert_eq!(received[0].quantity, 35);
        assert_eq!(received[1].medicine_id.as_str(), "B");
        assert_eq!(dispensed[0].quantity, 7);
    }

    #[test]
    fn test_audit_finds_drift_and_orphan_entries() {
        let lots = vec![lot("A", "L1", 8, "2026-01-01"), lot("A", "L2", 5, "2026-01-01")];
        let transactions = vec![
            entry(1, "A", "L1", 10),
            entry(2, "A", "L1", -2),
            entry(3, "A", "L2", 4),
            entry(4, "B", "OLD", 3),
        ];

        let found = audit(&lots, &transactions);

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].lot_code.as_str(), "L2");
        assert_eq!(found[0].lot_quantity, Some(5));
        assert_eq!(found[0].ledger_sum, 4);
        assert_eq!(found[1].medicine_id.as_str(), "B");
        assert_eq!(found[1].lot_quantity, None);
    }

    #[test]
    fn test_render_caps_lists() {
        let medicines: Vec<Medicine> = (0..12)
            .map(|i| medicine(&format!("M{i:02}"), MedicineCategory::EssentialDrug, 5))
            .collect();
        let report = monthly_report(MonthlyReportInput {
            month: ReportMonth { year: 2025, month: 5 },
            today: date("2025-06-01"),
            medicines: &medicines,
            lots: &[],
            transactions: &[],
            top_n: 5,
            near_expiry_days: 90,
        });

        let text = render_monthly_report(&report, 10);

        assert!(text.starts_with("Monthly stock report: May 2025"));
        assert!(text.contains("At or below reorder point: 12 items"));
        assert!(text.contains("...and 2 more items"));
        assert!(text.contains("(no receipts)"));
        assert!(text.contains("No lots near expiry."));
        assert_eq!(report.drug_count, 12);
        assert_eq!(report.supply_count, 0);
    }
}
