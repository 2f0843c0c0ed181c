//! Inventory service: every operation that reads or moves stock.
//!
//! Each mutating operation follows the same shape: take the per-medicine
//! lock, read the current lots, plan the change with the pure rules from
//! `clinic_stock_core`, then hand the whole plan to the store as one
//! [`ChangeSet`]. A rejected plan never reaches the store, and a store
//! failure leaves nothing half-written.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, instrument, warn};

use clinic_stock_core::{
    AllocationError, LedgerEntryRef, LotCode, MAX_QUANTITY, MedicineId, ReconciliationError,
    TransactionId, TransactionKind, is_valid_quantity, plan_delete, plan_edit, plan_fefo_batch,
};

use crate::clock::Clock;
use crate::config::{DuplicateLotPolicy, InventorySettings};
use crate::db::{ChangeSet, CommitReceipt, InventoryStore, RepositoryError, StockChange};
use crate::models::{
    AuditDiscrepancy, BatchDispenseOutcome, CreateMedicineInput, DispenseLine, DispenseOutcome,
    DispenseRequest, EditTransactionInput, LedgerLine, Lot, LotFilter, LowStockItem, Medicine,
    MedicineFilter, MonthlyReport, NearExpiryItem, NewLot, NewTransaction, OpeningBalanceInput,
    ReceiveInput, ReceiveOutcome, ReportMonth, RequestContext, StockSummary, Transaction,
    TransactionFilter, UpdateMedicineInput,
};
use crate::services::locks::MedicineLocks;
use crate::services::reports::{self, MonthlyReportInput};

/// Errors returned by inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Requested quantity exceeds the stock available across all lots.
    #[error("insufficient stock for {medicine_id}: requested {requested}, available {available}")]
    InsufficientStock {
        medicine_id: MedicineId,
        requested: i64,
        available: i64,
    },

    /// A lot update would have gone below zero. Raised by the store when a
    /// concurrent writer got there first; never retried.
    #[error("lot {lot_code} of {medicine_id} would go below zero")]
    NegativeStock {
        medicine_id: MedicineId,
        lot_code: LotCode,
    },

    /// The lot already exists and cannot take this receipt.
    #[error("lot {lot_code} of {medicine_id} already exists")]
    DuplicateLot {
        medicine_id: MedicineId,
        lot_code: LotCode,
    },

    /// Editing or deleting a ledger entry would break the stock balance.
    #[error("{0}")]
    Reconciliation(ReconciliationError),

    /// The caller may not perform this operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Medicine or ledger entry does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Request failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stock cannot move for a deactivated medicine.
    #[error("medicine {0} is inactive")]
    MedicineInactive(MedicineId),

    /// Medicine has lots or ledger entries and cannot be hard-deleted.
    #[error("medicine {0} has stock history; deactivate it instead")]
    MedicineInUse(MedicineId),

    /// Medicine ID is already on the master list.
    #[error("medicine {0} already exists")]
    MedicineExists(MedicineId),

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[source] RepositoryError),
}

impl From<RepositoryError> for InventoryError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NegativeQuantity {
                medicine_id,
                lot_code,
            } => Self::NegativeStock {
                medicine_id,
                lot_code,
            },
            RepositoryError::QuantityOverflow {
                medicine_id,
                lot_code,
            } => Self::InvalidInput(format!(
                "lot {lot_code} of {medicine_id} cannot hold that many units"
            )),
            other => Self::Storage(other),
        }
    }
}

impl From<ReconciliationError> for InventoryError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::InvalidQuantity(q) => Self::InvalidInput(quantity_message(q)),
            other => Self::Reconciliation(other),
        }
    }
}

impl From<AllocationError> for InventoryError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidQuantity(q) => Self::InvalidInput(quantity_message(q)),
            AllocationError::InsufficientStock {
                medicine_id,
                requested,
                available,
            } => Self::InsufficientStock {
                medicine_id,
                requested,
                available,
            },
        }
    }
}

/// Stock ledger operations over a pluggable store.
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
    clock: Arc<dyn Clock>,
    locks: MedicineLocks,
    settings: InventorySettings,
}

impl std::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl InventoryService {
    /// Create a service over the given store and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn InventoryStore>,
        clock: Arc<dyn Clock>,
        settings: InventorySettings,
    ) -> Self {
        Self {
            store,
            clock,
            locks: MedicineLocks::new(),
            settings,
        }
    }

    /// Business settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    /// Current date at the clinic.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Storage` if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), InventoryError> {
        Ok(self.store.ping().await?)
    }

    // =========================================================================
    // Medicine master data
    // =========================================================================

    /// Add a medicine to the master list.
    ///
    /// # Errors
    ///
    /// Returns `MedicineExists` if the ID is taken and `InvalidInput` for a
    /// blank name or unit or a negative reorder point.
    #[instrument(skip(self, input, ctx), fields(medicine_id = %input.id, actor = %ctx.actor))]
    pub async fn create_medicine(
        &self,
        input: CreateMedicineInput,
        ctx: &RequestContext,
    ) -> Result<Medicine, InventoryError> {
        let name = required_text("name", &input.name)?;
        let unit = required_text("unit", &input.unit)?;
        validate_min_stock(input.min_stock)?;

        let now = self.clock.now();
        let medicine = Medicine {
            id: input.id,
            name,
            unit,
            category: input.category,
            min_stock: input.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_medicine(&medicine)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => InventoryError::MedicineExists(medicine.id.clone()),
                other => other.into(),
            })?;

        info!(category = %medicine.category, "Medicine created");
        Ok(medicine)
    }

    /// Get a medicine by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the medicine does not exist.
    pub async fn get_medicine(&self, id: &MedicineId) -> Result<Medicine, InventoryError> {
        self.store
            .get_medicine(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("medicine {id}")))
    }

    /// List medicines ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn list_medicines(
        &self,
        filter: MedicineFilter,
    ) -> Result<Vec<Medicine>, InventoryError> {
        Ok(self.store.list_medicines(filter).await?)
    }

    /// Update a medicine's descriptive fields. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Permission` for non-admins, `NotFound` for an unknown ID and
    /// `InvalidInput` for blank text or a negative reorder point.
    #[instrument(skip(self, input, ctx), fields(medicine_id = %id, actor = %ctx.actor))]
    pub async fn update_medicine(
        &self,
        id: &MedicineId,
        input: UpdateMedicineInput,
        ctx: &RequestContext,
    ) -> Result<Medicine, InventoryError> {
        require_admin(ctx, "update medicines")?;
        let _guard = self.locks.lock(id).await;
        let mut medicine = self.get_medicine(id).await?;

        if let Some(name) = input.name {
            medicine.name = required_text("name", &name)?;
        }
        if let Some(unit) = input.unit {
            medicine.unit = required_text("unit", &unit)?;
        }
        if let Some(category) = input.category {
            medicine.category = category;
        }
        if let Some(min_stock) = input.min_stock {
            validate_min_stock(min_stock)?;
            medicine.min_stock = min_stock;
        }
        medicine.updated_at = self.clock.now();

        self.store.update_medicine(&medicine).await?;
        info!("Medicine updated");
        Ok(medicine)
    }

    /// Soft-delete a medicine: it keeps its history but stock can no longer
    /// move. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Permission` for non-admins and `NotFound` for an unknown ID.
    pub async fn deactivate_medicine(
        &self,
        id: &MedicineId,
        ctx: &RequestContext,
    ) -> Result<Medicine, InventoryError> {
        self.set_active(id, false, ctx).await
    }

    /// Bring a deactivated medicine back. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Permission` for non-admins and `NotFound` for an unknown ID.
    pub async fn reactivate_medicine(
        &self,
        id: &MedicineId,
        ctx: &RequestContext,
    ) -> Result<Medicine, InventoryError> {
        self.set_active(id, true, ctx).await
    }

    #[instrument(skip(self, ctx), fields(medicine_id = %id, actor = %ctx.actor))]
    async fn set_active(
        &self,
        id: &MedicineId,
        active: bool,
        ctx: &RequestContext,
    ) -> Result<Medicine, InventoryError> {
        require_admin(ctx, "change medicine status")?;
        let _guard = self.locks.lock(id).await;
        let mut medicine = self.get_medicine(id).await?;

        if medicine.is_active != active {
            medicine.is_active = active;
            medicine.updated_at = self.clock.now();
            self.store.update_medicine(&medicine).await?;
            info!(active, "Medicine status changed");
        }
        Ok(medicine)
    }

    /// Remove a medicine that has never held stock. Admin only.
    ///
    /// # Errors
    ///
    /// Returns `Permission` for non-admins, `NotFound` for an unknown ID and
    /// `MedicineInUse` if any lot or ledger entry references it.
    #[instrument(skip(self, ctx), fields(medicine_id = %id, actor = %ctx.actor))]
    pub async fn delete_medicine(
        &self,
        id: &MedicineId,
        ctx: &RequestContext,
    ) -> Result<(), InventoryError> {
        require_admin(ctx, "delete medicines")?;
        let _guard = self.locks.lock(id).await;
        self.get_medicine(id).await?;

        let has_lots = !self.lots_for_medicine(id).await?.is_empty();
        if has_lots || self.store.has_transactions(id).await? {
            warn!("Refusing to delete medicine with stock history");
            return Err(InventoryError::MedicineInUse(id.clone()));
        }

        match self.store.delete_medicine(id).await {
            Ok(true) => {
                info!("Medicine deleted");
                Ok(())
            }
            Ok(false) => Err(InventoryError::NotFound(format!("medicine {id}"))),
            Err(RepositoryError::Conflict(_)) => Err(InventoryError::MedicineInUse(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Lots
    // =========================================================================

    /// Lots of a medicine that still hold stock, in FEFO order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn available_lots(&self, medicine_id: &MedicineId) -> Result<Vec<Lot>, InventoryError> {
        Ok(self
            .store
            .list_lots(&LotFilter {
                medicine_id: Some(medicine_id.clone()),
                has_remaining: true,
                expiring_by: None,
            })
            .await?)
    }

    /// Every lot of a medicine, including consumed ones, in FEFO order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn lots_for_medicine(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Vec<Lot>, InventoryError> {
        Ok(self
            .store
            .list_lots(&LotFilter {
                medicine_id: Some(medicine_id.clone()),
                ..LotFilter::default()
            })
            .await?)
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Receive a delivery into stock.
    ///
    /// Creates the lot, or under the `TopUp` policy adds to an existing lot
    /// with the same dates, and records a `RECEIVE` entry in the same commit.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a non-positive quantity or expiry before manufacture
    /// - `NotFound` / `MedicineInactive` if the medicine cannot receive stock
    /// - `DuplicateLot` if the lot exists and cannot be topped up
    #[instrument(
        skip(self, input, ctx),
        fields(medicine_id = %input.medicine_id, lot_code = %input.lot_code, quantity = input.quantity, actor = %ctx.actor)
    )]
    pub async fn receive(
        &self,
        input: ReceiveInput,
        ctx: &RequestContext,
    ) -> Result<ReceiveOutcome, InventoryError> {
        if !is_valid_quantity(input.quantity) {
            return Err(InventoryError::InvalidInput(quantity_message(input.quantity)));
        }
        validate_dates(input.mfg_date, input.exp_date)?;

        let _guard = self.locks.lock(&input.medicine_id).await;
        self.require_active(&input.medicine_id).await?;

        let existing = self
            .store
            .get_lot(&input.medicine_id, &input.lot_code)
            .await?;
        let now = self.clock.now();
        let mut changes = ChangeSet::new(now);

        match existing {
            None => {
                changes.push(StockChange::CreateLot(NewLot {
                    medicine_id: input.medicine_id.clone(),
                    lot_code: input.lot_code.clone(),
                    quantity: input.quantity,
                    mfg_date: input.mfg_date,
                    exp_date: input.exp_date,
                }));
            }
            Some(lot) => {
                let dates_match = lot.exp_date == input.exp_date
                    && (input.mfg_date.is_none() || lot.mfg_date == input.mfg_date);
                if self.settings.duplicate_lot_policy != DuplicateLotPolicy::TopUp || !dates_match {
                    warn!("Receipt names an existing lot");
                    return Err(InventoryError::DuplicateLot {
                        medicine_id: input.medicine_id,
                        lot_code: input.lot_code,
                    });
                }
                changes.push(StockChange::AdjustLot {
                    medicine_id: input.medicine_id.clone(),
                    lot_code: input.lot_code.clone(),
                    delta: input.quantity,
                });
            }
        }

        changes.push(StockChange::Record(NewTransaction {
            medicine_id: input.medicine_id.clone(),
            lot_code: input.lot_code.clone(),
            delta: input.quantity,
            kind: TransactionKind::Receive,
            actor: ctx.actor.clone(),
            note: clean_note(input.note),
            created_at: now,
        }));

        let receipt = self.store.commit(changes).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => InventoryError::DuplicateLot {
                medicine_id: input.medicine_id.clone(),
                lot_code: input.lot_code.clone(),
            },
            other => other.into(),
        })?;

        let outcome = single_lot_outcome(receipt)?;
        info!(lot_quantity = outcome.lot.quantity, transaction_id = %outcome.transaction.id, "Stock received");
        Ok(outcome)
    }

    /// Load an opening balance carried over from earlier records. Admin only.
    ///
    /// Records an `INITIAL` entry. A positive balance creates the lot if it
    /// is missing; a negative balance can only reduce an existing lot.
    ///
    /// # Errors
    ///
    /// - `Permission` for non-admins
    /// - `InvalidInput` for a zero quantity, expiry before manufacture, or a
    ///   balance that would leave the lot below zero
    /// - `NotFound` for an unknown medicine
    #[instrument(
        skip(self, input, ctx),
        fields(medicine_id = %input.medicine_id, lot_code = %input.lot_code, quantity = input.quantity, actor = %ctx.actor)
    )]
    pub async fn record_opening_balance(
        &self,
        input: OpeningBalanceInput,
        ctx: &RequestContext,
    ) -> Result<ReceiveOutcome, InventoryError> {
        require_admin(ctx, "record opening balances")?;
        if input.quantity == 0 {
            return Err(InventoryError::InvalidInput(
                "opening balance cannot be zero".to_string(),
            ));
        }
        if !(-MAX_QUANTITY..=MAX_QUANTITY).contains(&input.quantity) {
            return Err(InventoryError::InvalidInput(quantity_message(input.quantity)));
        }
        validate_dates(input.mfg_date, input.exp_date)?;

        let _guard = self.locks.lock(&input.medicine_id).await;
        self.get_medicine(&input.medicine_id).await?;

        let existing = self
            .store
            .get_lot(&input.medicine_id, &input.lot_code)
            .await?;
        let now = self.clock.now();
        let mut changes = ChangeSet::new(now);

        match existing {
            None if input.quantity < 0 => {
                return Err(InventoryError::InvalidInput(format!(
                    "lot {} of {} has no stock to reduce by {}",
                    input.lot_code,
                    input.medicine_id,
                    input.quantity.abs()
                )));
            }
            None => {
                changes.push(StockChange::CreateLot(NewLot {
                    medicine_id: input.medicine_id.clone(),
                    lot_code: input.lot_code.clone(),
                    quantity: input.quantity,
                    mfg_date: input.mfg_date,
                    exp_date: input.exp_date,
                }));
            }
            Some(lot) => {
                if lot
                    .quantity
                    .checked_add(input.quantity)
                    .is_none_or(|resulting| resulting < 0)
                {
                    return Err(InventoryError::InvalidInput(format!(
                        "lot {} of {} holds {}; an opening balance of {} would leave it below zero",
                        lot.lot_code, lot.medicine_id, lot.quantity, input.quantity
                    )));
                }
                changes.push(StockChange::AdjustLot {
                    medicine_id: input.medicine_id.clone(),
                    lot_code: input.lot_code.clone(),
                    delta: input.quantity,
                });
            }
        }

        changes.push(StockChange::Record(NewTransaction {
            medicine_id: input.medicine_id,
            lot_code: input.lot_code,
            delta: input.quantity,
            kind: TransactionKind::Initial,
            actor: ctx.actor.clone(),
            note: clean_note(input.note),
            created_at: now,
        }));

        let outcome = single_lot_outcome(self.store.commit(changes).await?)?;
        info!(lot_quantity = outcome.lot.quantity, "Opening balance recorded");
        Ok(outcome)
    }

    // =========================================================================
    // Dispensing
    // =========================================================================

    /// Dispense `quantity` units of one medicine, first-expired-first-out.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` (with nothing written) if the medicine's
    /// lots cannot cover the request, plus the errors of
    /// [`Self::dispense_batch`].
    pub async fn dispense(
        &self,
        medicine_id: &MedicineId,
        quantity: i64,
        note: Option<String>,
        ctx: &RequestContext,
    ) -> Result<DispenseOutcome, InventoryError> {
        let request = DispenseRequest {
            lines: vec![DispenseLine {
                medicine_id: medicine_id.clone(),
                quantity,
            }],
            note,
        };

        self.dispense_batch(request, ctx)
            .await?
            .lines
            .into_iter()
            .next()
            .ok_or_else(|| {
                InventoryError::Storage(RepositoryError::DataCorruption(
                    "dispense produced no outcome".to_string(),
                ))
            })
    }

    /// Dispense several lines at once, all or nothing.
    ///
    /// Every line is planned before anything is written; lines naming the
    /// same medicine draw from the same lots cumulatively. Each lot taken
    /// from gets one `DISPENSE` entry.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty request or a non-positive quantity
    /// - `NotFound` / `MedicineInactive` for a medicine that cannot dispense
    /// - `InsufficientStock` if any line cannot be met
    #[instrument(skip(self, request, ctx), fields(lines = request.lines.len(), actor = %ctx.actor))]
    pub async fn dispense_batch(
        &self,
        request: DispenseRequest,
        ctx: &RequestContext,
    ) -> Result<BatchDispenseOutcome, InventoryError> {
        if request.lines.is_empty() {
            return Err(InventoryError::InvalidInput(
                "dispense request has no lines".to_string(),
            ));
        }
        if let Some(line) = request
            .lines
            .iter()
            .find(|line| !is_valid_quantity(line.quantity))
        {
            return Err(InventoryError::InvalidInput(format!(
                "{}: {}",
                line.medicine_id,
                quantity_message(line.quantity)
            )));
        }

        let _guard = self
            .locks
            .lock_many(request.lines.iter().map(|line| &line.medicine_id))
            .await;

        let mut snapshots = HashMap::new();
        for line in &request.lines {
            if snapshots.contains_key(&line.medicine_id) {
                continue;
            }
            self.require_active(&line.medicine_id).await?;
            let lots = self.available_lots(&line.medicine_id).await?;
            snapshots.insert(
                line.medicine_id.clone(),
                lots.iter().map(Lot::snapshot).collect::<Vec<_>>(),
            );
        }

        let requests: Vec<(MedicineId, i64)> = request
            .lines
            .iter()
            .map(|line| (line.medicine_id.clone(), line.quantity))
            .collect();

        let plans = plan_fefo_batch(&requests, &snapshots).inspect_err(|e| {
            warn!(error = %e, "Dispense rejected");
        })?;

        let now = self.clock.now();
        let note = clean_note(request.note);
        let mut changes = ChangeSet::new(now);
        for plan in &plans {
            for line in &plan.lines {
                changes
                    .push(StockChange::AdjustLot {
                        medicine_id: plan.medicine_id.clone(),
                        lot_code: line.lot_code.clone(),
                        delta: -line.quantity,
                    })
                    .push(StockChange::Record(NewTransaction {
                        medicine_id: plan.medicine_id.clone(),
                        lot_code: line.lot_code.clone(),
                        delta: -line.quantity,
                        kind: TransactionKind::Dispense,
                        actor: ctx.actor.clone(),
                        note: note.clone(),
                        created_at: now,
                    }));
            }
        }

        let receipt = self.store.commit(changes).await?;

        let mut recorded = receipt.recorded.into_iter();
        let lines = plans
            .into_iter()
            .map(|plan| {
                let transactions = recorded.by_ref().take(plan.lines.len()).collect();
                DispenseOutcome { plan, transactions }
            })
            .collect::<Vec<_>>();

        for outcome in &lines {
            info!(
                medicine_id = %outcome.plan.medicine_id,
                quantity = outcome.plan.requested,
                lots = outcome.plan.lines.len(),
                "Stock dispensed"
            );
        }

        Ok(BatchDispenseOutcome { lines })
    }

    // =========================================================================
    // Ledger corrections
    // =========================================================================

    /// Correct a ledger entry's quantity and/or note.
    ///
    /// The quantity is the unsigned magnitude; the sign follows the entry's
    /// kind. The lot moves by the same amount the entry changes.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown entry
    /// - `Permission` if a staff member edits someone else's entry
    /// - `Reconciliation` if the lot cannot absorb the change, or the entry
    ///   is an opening balance and the quantity differs
    #[instrument(skip(self, input, ctx), fields(transaction_id = %id, actor = %ctx.actor))]
    pub async fn edit_transaction(
        &self,
        id: TransactionId,
        input: EditTransactionInput,
        ctx: &RequestContext,
    ) -> Result<Transaction, InventoryError> {
        let (transaction, _guard) = self.lock_transaction(id, ctx).await?;
        let lot = self
            .store
            .get_lot(&transaction.medicine_id, &transaction.lot_code)
            .await?;

        let adjustment = plan_edit(
            entry_ref(&transaction),
            input.quantity,
            lot.as_ref().map(|l| l.quantity),
        )
        .inspect_err(|e| warn!(error = %e, "Edit rejected"))?;

        let note = match input.note {
            Some(note) => clean_note(Some(note)),
            None => transaction.note.clone(),
        };

        if adjustment.change == 0 && note == transaction.note {
            return Ok(transaction);
        }

        let mut changes = ChangeSet::new(self.clock.now());
        if adjustment.change != 0 {
            changes.push(StockChange::AdjustLot {
                medicine_id: transaction.medicine_id.clone(),
                lot_code: transaction.lot_code.clone(),
                delta: adjustment.change,
            });
        }
        changes.push(StockChange::UpdateTransaction {
            id,
            delta: adjustment.new_delta,
            note,
        });

        let updated = self
            .store
            .commit(changes)
            .await?
            .updated
            .into_iter()
            .next()
            .ok_or_else(|| InventoryError::NotFound(format!("transaction {id}")))?;

        info!(
            old_delta = transaction.delta,
            new_delta = updated.delta,
            lot_change = adjustment.change,
            "Ledger entry edited"
        );
        Ok(updated)
    }

    /// Delete a ledger entry, reversing its effect on the lot.
    ///
    /// Returns the deleted entry.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown entry
    /// - `Permission` if a staff member deletes someone else's entry
    /// - `Reconciliation` if reversing the entry would leave the lot below
    ///   zero or return stock to a lot with no stock record
    #[instrument(skip(self, ctx), fields(transaction_id = %id, actor = %ctx.actor))]
    pub async fn delete_transaction(
        &self,
        id: TransactionId,
        ctx: &RequestContext,
    ) -> Result<Transaction, InventoryError> {
        let (transaction, _guard) = self.lock_transaction(id, ctx).await?;
        let lot = self
            .store
            .get_lot(&transaction.medicine_id, &transaction.lot_code)
            .await?;

        let adjustment = plan_delete(entry_ref(&transaction), lot.as_ref().map(|l| l.quantity))
            .inspect_err(|e| warn!(error = %e, "Delete rejected"))?;

        let mut changes = ChangeSet::new(self.clock.now());
        changes
            .push(StockChange::AdjustLot {
                medicine_id: transaction.medicine_id.clone(),
                lot_code: transaction.lot_code.clone(),
                delta: adjustment.change,
            })
            .push(StockChange::DeleteTransaction(id));

        self.store.commit(changes).await?;

        info!(
            delta = transaction.delta,
            lot_quantity = adjustment.resulting,
            "Ledger entry deleted"
        );
        Ok(transaction)
    }

    /// Fetch an entry, check the caller may change it, and lock its medicine.
    ///
    /// The entry is re-read under the lock so the caller works on the
    /// current version.
    async fn lock_transaction(
        &self,
        id: TransactionId,
        ctx: &RequestContext,
    ) -> Result<(Transaction, crate::services::locks::MedicineGuard), InventoryError> {
        let found = self.get_transaction(id).await?;
        let guard = self.locks.lock(&found.medicine_id).await;
        let transaction = self.get_transaction(id).await?;

        if !ctx.can_modify(&transaction.actor) {
            warn!(owner = %transaction.actor, "Refusing to change another user's entry");
            return Err(InventoryError::Permission(format!(
                "transaction {id} was recorded by another user"
            )));
        }

        Ok((transaction, guard))
    }

    /// Get a ledger entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, InventoryError> {
        self.store
            .get_transaction(id)
            .await?
            .ok_or_else(|| InventoryError::NotFound(format!("transaction {id}")))
    }

    /// Ledger entries for a medicine in recording order.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn transactions_for_medicine(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Vec<Transaction>, InventoryError> {
        Ok(self
            .store
            .list_transactions(&TransactionFilter {
                medicine_id: Some(medicine_id.clone()),
                ..TransactionFilter::default()
            })
            .await?)
    }

    /// Ledger entries for a medicine with the running balance after each.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown medicine.
    pub async fn ledger_history(
        &self,
        medicine_id: &MedicineId,
    ) -> Result<Vec<LedgerLine>, InventoryError> {
        self.get_medicine(medicine_id).await?;
        let mut balance = 0_i64;

        Ok(self
            .transactions_for_medicine(medicine_id)
            .await?
            .into_iter()
            .map(|transaction| {
                balance += transaction.delta;
                LedgerLine {
                    transaction,
                    running_balance: balance,
                }
            })
            .collect())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Active medicines at or below their reorder point.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn low_stock_report(&self) -> Result<Vec<LowStockItem>, InventoryError> {
        let medicines = self.store.list_medicines(MedicineFilter::active()).await?;
        let lots = self.stocked_lots(None).await?;
        Ok(reports::low_stock(&medicines, &lots))
    }

    /// Lots with stock expiring within `horizon_days` (default from settings).
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn near_expiry_report(
        &self,
        horizon_days: Option<u32>,
    ) -> Result<Vec<NearExpiryItem>, InventoryError> {
        let today = self.clock.today();
        let horizon = horizon_days.unwrap_or(self.settings.near_expiry_days);
        let medicines = self.store.list_medicines(MedicineFilter::all()).await?;
        let lots = self
            .stocked_lots(Some(reports::horizon_end(today, horizon)))
            .await?;
        Ok(reports::near_expiry(&medicines, &lots, today, horizon))
    }

    /// Dashboard overview.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub async fn stock_summary(&self) -> Result<StockSummary, InventoryError> {
        let medicines = self.store.list_medicines(MedicineFilter::all()).await?;
        let lots = self.stocked_lots(None).await?;
        Ok(reports::stock_summary(
            &medicines,
            &lots,
            self.clock.today(),
            self.settings.dashboard_expiry_days,
        ))
    }

    /// Monthly report for `month`, by default the month before today.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an out-of-range month and `Storage` if the
    /// store fails.
    #[instrument(skip(self))]
    pub async fn monthly_report(
        &self,
        month: Option<ReportMonth>,
    ) -> Result<MonthlyReport, InventoryError> {
        let today = self.clock.today();
        let month = month.unwrap_or_else(|| ReportMonth::previous(today));
        let (Some(start), Some(end)) = (month.first_day(), month.next_first_day()) else {
            return Err(InventoryError::InvalidInput(format!("invalid month {month}")));
        };

        let offset = self.settings.utc_offset;
        let to_utc = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|dt| dt.and_local_timezone(offset).single())
                .map(|dt| dt.to_utc())
        };

        let medicines = self.store.list_medicines(MedicineFilter::all()).await?;
        let lots = self.stocked_lots(None).await?;
        let transactions = self
            .store
            .list_transactions(&TransactionFilter {
                from: to_utc(start),
                until: to_utc(end),
                ..TransactionFilter::default()
            })
            .await?;

        let report = reports::monthly_report(MonthlyReportInput {
            month,
            today,
            medicines: &medicines,
            lots: &lots,
            transactions: &transactions,
            top_n: self.settings.report_top_n,
            near_expiry_days: self.settings.near_expiry_days,
        });

        info!(
            low_stock = report.low_stock.len(),
            near_expiry = report.near_expiry.len(),
            "Monthly report built"
        );
        Ok(report)
    }

    /// Monthly report rendered as plain text.
    ///
    /// # Errors
    ///
    /// Same as [`Self::monthly_report`].
    pub async fn monthly_report_text(
        &self,
        month: Option<ReportMonth>,
    ) -> Result<String, InventoryError> {
        let report = self.monthly_report(month).await?;
        Ok(reports::render_monthly_report(
            &report,
            self.settings.report_list_limit,
        ))
    }

    /// Lots whose quantity disagrees with their ledger.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    #[instrument(skip(self))]
    pub async fn audit_ledger(&self) -> Result<Vec<AuditDiscrepancy>, InventoryError> {
        let lots = self.store.list_lots(&LotFilter::default()).await?;
        let transactions = self
            .store
            .list_transactions(&TransactionFilter::default())
            .await?;

        let discrepancies = reports::audit(&lots, &transactions);
        if discrepancies.is_empty() {
            info!(lots = lots.len(), "Ledger audit clean");
        } else {
            warn!(count = discrepancies.len(), "Ledger audit found discrepancies");
        }
        Ok(discrepancies)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_active(&self, medicine_id: &MedicineId) -> Result<Medicine, InventoryError> {
        let medicine = self.get_medicine(medicine_id).await?;
        if !medicine.is_active {
            return Err(InventoryError::MedicineInactive(medicine.id));
        }
        Ok(medicine)
    }

    async fn stocked_lots(&self, expiring_by: Option<NaiveDate>) -> Result<Vec<Lot>, InventoryError> {
        Ok(self
            .store
            .list_lots(&LotFilter {
                medicine_id: None,
                has_remaining: true,
                expiring_by,
            })
            .await?)
    }
}

fn entry_ref(transaction: &Transaction) -> LedgerEntryRef<'_> {
    LedgerEntryRef {
        medicine_id: &transaction.medicine_id,
        lot_code: &transaction.lot_code,
        kind: transaction.kind,
        delta: transaction.delta,
    }
}

fn require_admin(ctx: &RequestContext, action: &str) -> Result<(), InventoryError> {
    if ctx.is_admin() {
        Ok(())
    } else {
        Err(InventoryError::Permission(format!(
            "only admins may {action}"
        )))
    }
}

fn required_text(field: &str, value: &str) -> Result<String, InventoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_owned())
}

fn quantity_message(quantity: i64) -> String {
    format!("quantity must be between 1 and {MAX_QUANTITY} (got {quantity})")
}

fn validate_min_stock(min_stock: i64) -> Result<(), InventoryError> {
    if min_stock < 0 {
        return Err(InventoryError::InvalidInput(format!(
            "reorder point cannot be negative (got {min_stock})"
        )));
    }
    Ok(())
}

fn validate_dates(mfg_date: Option<NaiveDate>, exp_date: NaiveDate) -> Result<(), InventoryError> {
    match mfg_date {
        Some(mfg) if mfg > exp_date => Err(InventoryError::InvalidInput(format!(
            "expiry date {exp_date} is before manufacture date {mfg}"
        ))),
        _ => Ok(()),
    }
}

/// Trim a note; blank notes become `None`.
fn clean_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty())
}

fn single_lot_outcome(receipt: CommitReceipt) -> Result<ReceiveOutcome, InventoryError> {
    match (receipt.lots.into_iter().next(), receipt.recorded.into_iter().next()) {
        (Some(lot), Some(transaction)) => Ok(ReceiveOutcome { lot, transaction }),
        _ => Err(InventoryError::Storage(RepositoryError::DataCorruption(
            "commit did not return the written lot and entry".to_string(),
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use clinic_stock_core::MedicineCategory;

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryInventoryStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn med(id: &str) -> MedicineId {
        MedicineId::parse(id).unwrap()
    }

    fn lot_code(code: &str) -> LotCode {
        LotCode::parse(code).unwrap()
    }

    fn nurse() -> RequestContext {
        RequestContext::staff("nurse@clinic.test")
    }

    fn admin() -> RequestContext {
        RequestContext::admin("head@clinic.test")
    }

    async fn service_with(settings: InventorySettings) -> (InventoryService, Arc<MemoryInventoryStore>) {
        let store = Arc::new(MemoryInventoryStore::new());
        let clock = Arc::new(FixedClock::on(date("2025-06-15")));
        let service = InventoryService::new(store.clone(), clock, settings);
        service
            .create_medicine(
                CreateMedicineInput {
                    id: med("PARA500"),
                    name: "Paracetamol 500 mg".to_owned(),
                    unit: "tablet".to_owned(),
                    category: MedicineCategory::EssentialDrug,
                    min_stock: 20,
                },
                &nurse(),
            )
            .await
            .unwrap();
        (service, store)
    }

    async fn service() -> (InventoryService, Arc<MemoryInventoryStore>) {
        service_with(InventorySettings::default()).await
    }

    fn receipt(code: &str, quantity: i64, exp: &str) -> ReceiveInput {
        ReceiveInput {
            medicine_id: med("PARA500"),
            lot_code: lot_code(code),
            quantity,
            mfg_date: None,
            exp_date: date(exp),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_receive_creates_lot_and_entry() {
        let (service, _) = service().await;

        let outcome = service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();

        assert_eq!(outcome.lot.quantity, 10);
        assert_eq!(outcome.transaction.delta, 10);
        assert_eq!(outcome.transaction.kind, TransactionKind::Receive);
        assert_eq!(outcome.transaction.actor, "nurse@clinic.test");
    }

    #[tokio::test]
    async fn test_receive_rejects_duplicate_lot_by_default() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();

        let err = service
            .receive(receipt("A", 5, "2026-01-01"), &nurse())
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::DuplicateLot { .. }));
        assert_eq!(service.available_lots(&med("PARA500")).await.unwrap()[0].quantity, 10);
    }

    #[tokio::test]
    async fn test_top_up_policy_requires_matching_dates() {
        let settings = InventorySettings {
            duplicate_lot_policy: DuplicateLotPolicy::TopUp,
            ..InventorySettings::default()
        };
        let (service, _) = service_with(settings).await;
        service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();

        let topped = service
            .receive(receipt("A", 5, "2026-01-01"), &nurse())
            .await
            .unwrap();
        let mismatch = service
            .receive(receipt("A", 5, "2026-02-01"), &nurse())
            .await
            .unwrap_err();

        assert_eq!(topped.lot.quantity, 15);
        assert!(matches!(mismatch, InventoryError::DuplicateLot { .. }));
    }

    #[tokio::test]
    async fn test_quantities_above_limit_are_rejected() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", MAX_QUANTITY, "2026-01-01"), &nurse())
            .await
            .unwrap();
        let first = service
            .receive(receipt("B", 1, "2026-02-01"), &nurse())
            .await
            .unwrap();

        let receive = service
            .receive(receipt("C", MAX_QUANTITY + 1, "2026-01-01"), &nurse())
            .await
            .unwrap_err();
        let dispense = service
            .dispense(&med("PARA500"), MAX_QUANTITY + 1, None, &nurse())
            .await
            .unwrap_err();
        let edit = service
            .edit_transaction(
                first.transaction.id,
                EditTransactionInput {
                    quantity: Some(MAX_QUANTITY + 1),
                    note: None,
                },
                &nurse(),
            )
            .await
            .unwrap_err();
        let opening = service
            .record_opening_balance(
                OpeningBalanceInput {
                    medicine_id: med("PARA500"),
                    lot_code: lot_code("A"),
                    quantity: i64::MIN,
                    mfg_date: None,
                    exp_date: date("2026-01-01"),
                    note: None,
                },
                &admin(),
            )
            .await
            .unwrap_err();

        assert!(matches!(receive, InventoryError::InvalidInput(_)));
        assert!(matches!(dispense, InventoryError::InvalidInput(_)));
        assert!(matches!(edit, InventoryError::InvalidInput(_)));
        assert!(matches!(opening, InventoryError::InvalidInput(_)));

        // Large lots still add up in every report.
        let history = service.ledger_history(&med("PARA500")).await.unwrap();
        assert_eq!(history.last().unwrap().running_balance, MAX_QUANTITY + 1);
        assert!(service.low_stock_report().await.unwrap().is_empty());
        assert!(service.audit_ledger().await.unwrap().is_empty());
        assert_eq!(service.stock_summary().await.unwrap().total_units, MAX_QUANTITY + 1);
    }

    #[tokio::test]
    async fn test_top_up_that_would_overflow_changes_nothing() {
        let settings = InventorySettings {
            duplicate_lot_policy: DuplicateLotPolicy::TopUp,
            ..InventorySettings::default()
        };
        let (service, store) = service_with(settings).await;
        service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();
        store
            .force_lot_quantity(&med("PARA500"), &lot_code("A"), i64::MAX - 5)
            .await
            .unwrap();

        let err = service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::InvalidInput(_)));
        let lots = service.lots_for_medicine(&med("PARA500")).await.unwrap();
        assert_eq!(lots[0].quantity, i64::MAX - 5);
        assert_eq!(
            service
                .transactions_for_medicine(&med("PARA500"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_receive_validates_input() {
        let (service, _) = service().await;

        let zero = service
            .receive(receipt("A", 0, "2026-01-01"), &nurse())
            .await
            .unwrap_err();
        let mut backwards = receipt("A", 1, "2026-01-01");
        backwards.mfg_date = Some(date("2026-02-01"));
        let backwards = service.receive(backwards, &nurse()).await.unwrap_err();
        let mut unknown = receipt("A", 1, "2026-01-01");
        unknown.medicine_id = med("NOPE");
        let unknown = service.receive(unknown, &nurse()).await.unwrap_err();

        assert!(matches!(zero, InventoryError::InvalidInput(_)));
        assert!(matches!(backwards, InventoryError::InvalidInput(_)));
        assert!(matches!(unknown, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_medicine_cannot_move_stock() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();
        service
            .deactivate_medicine(&med("PARA500"), &admin())
            .await
            .unwrap();

        let err = service
            .dispense(&med("PARA500"), 1, None, &nurse())
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::MedicineInactive(_)));
    }

    #[tokio::test]
    async fn test_dispense_fefo_across_lots() {
        let (service, _) = service().await;
        service
            .receive(receipt("B", 10, "2025-12-01"), &nurse())
            .await
            .unwrap();
        service
            .receive(receipt("A", 10, "2025-09-01"), &nurse())
            .await
            .unwrap();

        let outcome = service
            .dispense(&med("PARA500"), 15, Some("ward round".to_owned()), &nurse())
            .await
            .unwrap();

        assert_eq!(outcome.plan.lines.len(), 2);
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.transactions[0].lot_code.as_str(), "A");
        assert_eq!(outcome.transactions[0].delta, -10);
        assert_eq!(outcome.transactions[1].delta, -5);
        assert_eq!(outcome.transactions[1].note.as_deref(), Some("ward round"));

        let lots = service.available_lots(&med("PARA500")).await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_code.as_str(), "B");
        assert_eq!(lots[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", 5, "2025-09-01"), &nurse())
            .await
            .unwrap();
        let before = service.transactions_for_medicine(&med("PARA500")).await.unwrap();

        let err = service
            .dispense(&med("PARA500"), 10, None, &nurse())
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
        assert_eq!(
            service.transactions_for_medicine(&med("PARA500")).await.unwrap(),
            before
        );
        assert_eq!(service.available_lots(&med("PARA500")).await.unwrap()[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_staff_cannot_edit_other_users_entries() {
        let (service, _) = service().await;
        let received = service
            .receive(receipt("A", 20, "2026-01-01"), &nurse())
            .await
            .unwrap();

        let other = RequestContext::staff("pharmacist@clinic.test");
        let err = service
            .delete_transaction(received.transaction.id, &other)
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Permission(_)));
        service
            .delete_transaction(received.transaction.id, &admin())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_note_only_edit_leaves_lot_alone() {
        let (service, _) = service().await;
        let received = service
            .receive(receipt("A", 20, "2026-01-01"), &nurse())
            .await
            .unwrap();

        let edited = service
            .edit_transaction(
                received.transaction.id,
                EditTransactionInput {
                    quantity: None,
                    note: Some("invoice 42".to_owned()),
                },
                &nurse(),
            )
            .await
            .unwrap();

        assert_eq!(edited.delta, 20);
        assert_eq!(edited.note.as_deref(), Some("invoice 42"));
        assert_eq!(service.available_lots(&med("PARA500")).await.unwrap()[0].quantity, 20);
    }

    #[tokio::test]
    async fn test_opening_balance_is_admin_only_and_locked() {
        let (service, _) = service().await;
        let input = OpeningBalanceInput {
            medicine_id: med("PARA500"),
            lot_code: lot_code("OLD"),
            quantity: 30,
            mfg_date: None,
            exp_date: date("2026-03-01"),
            note: None,
        };

        let denied = service
            .record_opening_balance(input.clone(), &nurse())
            .await
            .unwrap_err();
        let outcome = service.record_opening_balance(input, &admin()).await.unwrap();
        let locked = service
            .edit_transaction(
                outcome.transaction.id,
                EditTransactionInput {
                    quantity: Some(25),
                    note: None,
                },
                &admin(),
            )
            .await
            .unwrap_err();

        assert!(matches!(denied, InventoryError::Permission(_)));
        assert_eq!(outcome.transaction.kind, TransactionKind::Initial);
        assert!(matches!(
            locked,
            InventoryError::Reconciliation(ReconciliationError::InitialBalanceLocked)
        ));
    }

    #[tokio::test]
    async fn test_delete_medicine_guarded_by_history() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", 1, "2026-01-01"), &nurse())
            .await
            .unwrap();
        service
            .create_medicine(
                CreateMedicineInput {
                    id: med("TYPO"),
                    name: "Typo".to_owned(),
                    unit: "box".to_owned(),
                    category: MedicineCategory::MedicalSupply,
                    min_stock: 0,
                },
                &nurse(),
            )
            .await
            .unwrap();

        let in_use = service
            .delete_medicine(&med("PARA500"), &admin())
            .await
            .unwrap_err();
        service.delete_medicine(&med("TYPO"), &admin()).await.unwrap();

        assert!(matches!(in_use, InventoryError::MedicineInUse(_)));
        assert!(matches!(
            service.get_medicine(&med("TYPO")).await.unwrap_err(),
            InventoryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_ledger_history_running_balance() {
        let (service, _) = service().await;
        service
            .receive(receipt("A", 10, "2025-09-01"), &nurse())
            .await
            .unwrap();
        service
            .receive(receipt("B", 5, "2025-10-01"), &nurse())
            .await
            .unwrap();
        service
            .dispense(&med("PARA500"), 12, None, &nurse())
            .await
            .unwrap();

        let history = service.ledger_history(&med("PARA500")).await.unwrap();
        let balances: Vec<i64> = history.iter().map(|l| l.running_balance).collect();

        assert_eq!(balances, [10, 15, 5, 3]);
    }

    #[tokio::test]
    async fn test_audit_reports_forced_drift() {
        let (service, store) = service().await;
        service
            .receive(receipt("A", 10, "2026-01-01"), &nurse())
            .await
            .unwrap();
        assert!(service.audit_ledger().await.unwrap().is_empty());

        store
            .force_lot_quantity(&med("PARA500"), &lot_code("A"), 7)
            .await
            .unwrap();
        let found = service.audit_ledger().await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].lot_quantity, Some(7));
        assert_eq!(found[0].ledger_sum, 10);
    }

    #[tokio::test]
    async fn test_monthly_report_defaults_to_previous_month() {
        let (service, _) = service().await;

        let report = service.monthly_report(None).await.unwrap();

        assert_eq!(report.month, ReportMonth { year: 2025, month: 5 });
        assert_eq!(report.drug_count, 1);
        assert_eq!(report.low_stock_drugs, 1);
    }
}
