//! Report shapes: alerts, dashboard summary, monthly report and ledger audit.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use clinic_stock_core::{LotCode, MedicineCategory, MedicineId};

/// A medicine at or below its reorder point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub medicine_id: MedicineId,
    pub name: String,
    pub unit: String,
    pub category: MedicineCategory,
    /// Units on hand across all lots.
    pub remaining: i64,
    /// Reorder point.
    pub threshold: i64,
}

/// A lot with stock that expires within the report horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearExpiryItem {
    pub medicine_id: MedicineId,
    /// Medicine name; `None` if the lot's medicine is not on the master list.
    pub name: Option<String>,
    pub unit: Option<String>,
    pub lot_code: LotCode,
    pub remaining: i64,
    pub exp_date: NaiveDate,
    /// Days from today until expiry; negative once expired.
    pub days_left: i64,
}

/// Stock on hand for one medicine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummaryItem {
    pub medicine_id: MedicineId,
    pub name: String,
    pub unit: String,
    pub quantity: i64,
    /// Lots with stock.
    pub lot_count: usize,
}

/// Dashboard overview of stock on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub as_of: NaiveDate,
    /// Distinct medicines with stock.
    pub medicines_in_stock: usize,
    /// Units across all lots.
    pub total_units: i64,
    /// Lots with stock expiring within `horizon_days`.
    pub near_expiry_lots: usize,
    pub horizon_days: u32,
    pub items: Vec<StockSummaryItem>,
}

/// Units moved for one medicine over a reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementItem {
    pub medicine_id: MedicineId,
    pub name: String,
    pub unit: String,
    /// Units moved (always positive).
    pub quantity: i64,
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportMonth {
    pub year: i32,
    pub month: u32,
}

impl ReportMonth {
    /// The month containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month before the one containing `date`.
    #[must_use]
    pub fn previous(date: NaiveDate) -> Self {
        let this = Self::containing(date);
        if this.month == 1 {
            Self {
                year: this.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: this.year,
                month: this.month - 1,
            }
        }
    }

    /// Parse `YYYY-MM`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the problem if the input is malformed.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month {s:?}: expected YYYY-MM"))?;
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in {s:?}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in {s:?}"))?;
        let parsed = Self { year, month };
        parsed
            .first_day()
            .map(|_| parsed)
            .ok_or_else(|| format!("invalid month {s:?}"))
    }

    /// First day of the month, `None` if the month is out of range.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// First day of the following month.
    #[must_use]
    pub fn next_first_day(self) -> Option<NaiveDate> {
        self.first_day()?.checked_add_months(Months::new(1))
    }

    /// English month name.
    #[must_use]
    pub const fn month_name(self) -> &'static str {
        match self.month {
            1 => "January",
            2 => "February",
            3 => "March",
            4 => "April",
            5 => "May",
            6 => "June",
            7 => "July",
            8 => "August",
            9 => "September",
            10 => "October",
            11 => "November",
            12 => "December",
            _ => "Unknown",
        }
    }
}

impl std::fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Monthly stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub month: ReportMonth,
    pub generated_on: NaiveDate,
    /// Active drug items on the master list.
    pub drug_count: usize,
    /// Active supply items on the master list.
    pub supply_count: usize,
    /// Most received medicines during the month, largest first.
    pub top_received: Vec<MovementItem>,
    /// Most dispensed medicines during the month, largest first.
    pub top_dispensed: Vec<MovementItem>,
    /// Every medicine currently at or below its reorder point.
    pub low_stock: Vec<LowStockItem>,
    pub low_stock_drugs: usize,
    pub low_stock_supplies: usize,
    /// Lots with stock expiring within `near_expiry_days` of `generated_on`.
    pub near_expiry: Vec<NearExpiryItem>,
    pub near_expiry_days: u32,
}

/// A lot whose quantity differs from the sum of its ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDiscrepancy {
    pub medicine_id: MedicineId,
    pub lot_code: LotCode,
    /// Quantity on the lot row; `None` if there is no lot row.
    pub lot_quantity: Option<i64>,
    /// Signed sum of the lot's ledger entries.
    pub ledger_sum: i64,
}
