//! In-process store backed by ordered maps.
//!
//! Used when no database is configured and throughout the test suites.
//! A commit clones the whole state, applies the change set to the copy and
//! swaps it in only if every step succeeded.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use clinic_stock_core::{LotCode, MedicineId, TransactionId};

use super::{ChangeSet, CommitReceipt, InventoryStore, RepositoryError, StockChange};
use crate::models::{
    Lot, LotFilter, Medicine, MedicineFilter, Transaction, TransactionFilter,
};

type LotKey = (MedicineId, LotCode);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    medicines: BTreeMap<MedicineId, Medicine>,
    lots: BTreeMap<LotKey, Lot>,
    transactions: BTreeMap<TransactionId, Transaction>,
    next_transaction_id: i64,
}

impl MemoryState {
    fn apply(
        &mut self,
        change: StockChange,
        at: DateTime<Utc>,
        receipt: &mut CommitReceipt,
        touched: &mut Vec<LotKey>,
    ) -> Result<(), RepositoryError> {
        match change {
            StockChange::CreateLot(new) => {
                let key = (new.medicine_id.clone(), new.lot_code.clone());
                if self.lots.contains_key(&key) {
                    return Err(RepositoryError::Conflict(format!(
                        "lot {} of {} already exists",
                        new.lot_code, new.medicine_id
                    )));
                }
                if new.quantity < 0 {
                    return Err(RepositoryError::NegativeQuantity {
                        medicine_id: new.medicine_id,
                        lot_code: new.lot_code,
                    });
                }
                self.lots.insert(
                    key.clone(),
                    Lot {
                        medicine_id: new.medicine_id,
                        lot_code: new.lot_code,
                        quantity: new.quantity,
                        mfg_date: new.mfg_date,
                        exp_date: new.exp_date,
                        created_at: at,
                        updated_at: at,
                    },
                );
                touch(touched, key);
            }
            StockChange::AdjustLot {
                medicine_id,
                lot_code,
                delta,
            } => {
                let key = (medicine_id, lot_code);
                let lot = self.lots.get_mut(&key).ok_or(RepositoryError::NotFound)?;
                let Some(resulting) = lot.quantity.checked_add(delta) else {
                    return Err(RepositoryError::QuantityOverflow {
                        medicine_id: key.0,
                        lot_code: key.1,
                    });
                };
                if resulting < 0 {
                    return Err(RepositoryError::NegativeQuantity {
                        medicine_id: key.0,
                        lot_code: key.1,
                    });
                }
                lot.quantity = resulting;
                lot.updated_at = at;
                touch(touched, key);
            }
            StockChange::Record(new) => {
                self.next_transaction_id += 1;
                let id = TransactionId::new(self.next_transaction_id);
                let transaction = Transaction {
                    id,
                    medicine_id: new.medicine_id,
                    lot_code: new.lot_code,
                    delta: new.delta,
                    kind: new.kind,
                    actor: new.actor,
                    note: new.note,
                    created_at: new.created_at,
                };
                self.transactions.insert(id, transaction.clone());
                receipt.recorded.push(transaction);
            }
            StockChange::UpdateTransaction { id, delta, note } => {
                let transaction = self
                    .transactions
                    .get_mut(&id)
                    .ok_or(RepositoryError::NotFound)?;
                transaction.delta = delta;
                transaction.note = note;
                receipt.updated.push(transaction.clone());
            }
            StockChange::DeleteTransaction(id) => {
                self.transactions
                    .remove(&id)
                    .ok_or(RepositoryError::NotFound)?;
            }
        }
        Ok(())
    }
}

fn touch(touched: &mut Vec<LotKey>, key: LotKey) {
    if !touched.contains(&key) {
        touched.push(key);
    }
}

fn lot_matches(lot: &Lot, filter: &LotFilter) -> bool {
    filter
        .medicine_id
        .as_ref()
        .is_none_or(|id| &lot.medicine_id == id)
        && (!filter.has_remaining || lot.quantity > 0)
        && filter.expiring_by.is_none_or(|date| lot.expires_by(date))
}

fn transaction_matches(transaction: &Transaction, filter: &TransactionFilter) -> bool {
    filter
        .medicine_id
        .as_ref()
        .is_none_or(|id| &transaction.medicine_id == id)
        && filter.kind.is_none_or(|kind| transaction.kind == kind)
        && filter.from.is_none_or(|from| transaction.created_at >= from)
        && filter.until.is_none_or(|until| transaction.created_at < until)
}

/// Store that keeps everything in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryInventoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a ledger entry without touching any lot.
    ///
    /// Stands in for entries carried over from earlier records, which may not
    /// match any lot. Only meant for seeding and tests.
    pub async fn insert_raw_transaction(&self, transaction: Transaction) {
        let mut state = self.state.write().await;
        state.next_transaction_id = state.next_transaction_id.max(transaction.id.as_i64());
        state.transactions.insert(transaction.id, transaction);
    }

    /// Overwrite a lot's quantity without writing a ledger entry.
    ///
    /// Only meant for seeding and tests, e.g. to simulate drift that the
    /// ledger audit should catch.
    pub async fn force_lot_quantity(
        &self,
        medicine_id: &MedicineId,
        lot_code: &LotCode,
        quantity: i64,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let lot = state
            .lots
            .get_mut(&(medicine_id.clone(), lot_code.clone()))
            .ok_or(RepositoryError::NotFound)?;
        lot.quantity = quantity;
        Ok(())
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn insert_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.medicines.contains_key(&medicine.id) {
            return Err(RepositoryError::Conflict(format!(
                "medicine {} already exists",
                medicine.id
            )));
        }
        state.medicines.insert(medicine.id.clone(), medicine.clone());
        Ok(())
    }

    async fn get_medicine(&self, id: &MedicineId) -> Result<Option<Medicine>, RepositoryError> {
        Ok(self.state.read().await.medicines.get(id).cloned())
    }

    async fn list_medicines(
        &self,
        filter: MedicineFilter,
    ) -> Result<Vec<Medicine>, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .medicines
            .values()
            .filter(|m| filter.include_inactive || m.is_active)
            .cloned()
            .collect())
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let existing = state
            .medicines
            .get_mut(&medicine.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = medicine.clone();
        Ok(())
    }

    async fn delete_medicine(&self, id: &MedicineId) -> Result<bool, RepositoryError> {
        Ok(self.state.write().await.medicines.remove(id).is_some())
    }

    async fn get_lot(
        &self,
        medicine_id: &MedicineId,
        lot_code: &LotCode,
    ) -> Result<Option<Lot>, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .lots
            .get(&(medicine_id.clone(), lot_code.clone()))
            .cloned())
    }

    async fn list_lots(&self, filter: &LotFilter) -> Result<Vec<Lot>, RepositoryError> {
        let state = self.state.read().await;
        let mut lots: Vec<Lot> = state
            .lots
            .values()
            .filter(|lot| lot_matches(lot, filter))
            .cloned()
            .collect();
        lots.sort_by(|a, b| {
            a.medicine_id
                .cmp(&b.medicine_id)
                .then(a.exp_date.cmp(&b.exp_date))
                .then_with(|| a.lot_code.cmp(&b.lot_code))
        });
        Ok(lots)
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        let state = self.state.read().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| transaction_matches(t, filter))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(transactions)
    }

    async fn has_transactions(&self, medicine_id: &MedicineId) -> Result<bool, RepositoryError> {
        Ok(self
            .state
            .read()
            .await
            .transactions
            .values()
            .any(|t| &t.medicine_id == medicine_id))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, RepositoryError> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let mut receipt = CommitReceipt::default();
        let mut touched = Vec::new();

        for change in changes.changes {
            next.apply(change, changes.at, &mut receipt, &mut touched)?;
        }

        receipt.lots = touched
            .iter()
            .filter_map(|key| next.lots.get(key).cloned())
            .collect();
        *state = next;
        Ok(receipt)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;

    use clinic_stock_core::TransactionKind;

    use super::*;
    use crate::models::{NewLot, NewTransaction};

    fn ids() -> (MedicineId, LotCode) {
        (
            MedicineId::parse("PARA500").unwrap(),
            LotCode::parse("L1").unwrap(),
        )
    }

    fn new_lot(quantity: i64) -> NewLot {
        let (medicine_id, lot_code) = ids();
        NewLot {
            medicine_id,
            lot_code,
            quantity,
            mfg_date: None,
            exp_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
        }
    }

    fn record(delta: i64) -> NewTransaction {
        let (medicine_id, lot_code) = ids();
        NewTransaction {
            medicine_id,
            lot_code,
            delta,
            kind: TransactionKind::Receive,
            actor: "nurse@clinic.test".to_owned(),
            note: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_applies_all_changes() {
        let store = MemoryInventoryStore::new();
        let mut changes = ChangeSet::new(Utc::now());
        changes
            .push(StockChange::CreateLot(new_lot(10)))
            .push(StockChange::Record(record(10)));

        let receipt = store.commit(changes).await.unwrap();

        assert_eq!(receipt.lots[0].quantity, 10);
        assert_eq!(receipt.recorded[0].id, TransactionId::new(1));
    }

    #[tokio::test]
    async fn test_failed_step_rolls_back_everything() {
        let store = MemoryInventoryStore::new();
        let (medicine_id, lot_code) = ids();
        let mut changes = ChangeSet::new(Utc::now());
        changes
            .push(StockChange::CreateLot(new_lot(3)))
            .push(StockChange::Record(record(3)))
            .push(StockChange::AdjustLot {
                medicine_id: medicine_id.clone(),
                lot_code: lot_code.clone(),
                delta: -5,
            });

        let err = store.commit(changes).await.unwrap_err();

        assert!(matches!(err, RepositoryError::NegativeQuantity { .. }));
        assert!(store.get_lot(&medicine_id, &lot_code).await.unwrap().is_none());
        assert!(
            store
                .list_transactions(&TransactionFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_duplicate_lot_conflicts() {
        let store = MemoryInventoryStore::new();
        let mut first = ChangeSet::new(Utc::now());
        first.push(StockChange::CreateLot(new_lot(1)));
        store.commit(first).await.unwrap();

        let mut second = ChangeSet::new(Utc::now());
        second.push(StockChange::CreateLot(new_lot(1)));

        assert!(matches!(
            store.commit(second).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_overflowing_adjustment_is_refused() {
        let store = MemoryInventoryStore::new();
        let (medicine_id, lot_code) = ids();
        let mut first = ChangeSet::new(Utc::now());
        first.push(StockChange::CreateLot(new_lot(i64::MAX - 5)));
        store.commit(first).await.unwrap();

        let mut top_up = ChangeSet::new(Utc::now());
        top_up
            .push(StockChange::AdjustLot {
                medicine_id: medicine_id.clone(),
                lot_code: lot_code.clone(),
                delta: 10,
            })
            .push(StockChange::Record(record(10)));

        assert!(matches!(
            store.commit(top_up).await.unwrap_err(),
            RepositoryError::QuantityOverflow { .. }
        ));
        let lot = store.get_lot(&medicine_id, &lot_code).await.unwrap().unwrap();
        assert_eq!(lot.quantity, i64::MAX - 5);
    }
}
