//! Domain models for the stock ledger.
//!
//! Records returned by the repositories, the inputs accepted by the service
//! layer, and the shapes of the reports built from them.

pub mod context;
pub mod lot;
pub mod medicine;
pub mod report;
pub mod transaction;

pub use context::RequestContext;
pub use lot::{Lot, LotFilter, NewLot, OpeningBalanceInput, ReceiveInput, ReceiveOutcome};
pub use medicine::{CreateMedicineInput, Medicine, MedicineFilter, UpdateMedicineInput};
pub use report::{
    AuditDiscrepancy, LowStockItem, MonthlyReport, MovementItem, NearExpiryItem, ReportMonth,
    StockSummary, StockSummaryItem,
};
pub use transaction::{
    BatchDispenseOutcome, DispenseLine, DispenseOutcome, DispenseRequest, EditTransactionInput,
    LedgerLine, NewTransaction, Transaction, TransactionFilter,
};
