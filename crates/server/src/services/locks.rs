//! Per-medicine mutual exclusion.
//!
//! Every read-plan-commit sequence that changes a medicine's stock runs while
//! holding that medicine's lock. Multi-medicine operations take their locks
//! in ascending ID order so two batches can never wait on each other.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use clinic_stock_core::MedicineId;

/// Registry of one async mutex per medicine.
#[derive(Debug, Default)]
pub struct MedicineLocks {
    inner: Mutex<HashMap<MedicineId, Arc<AsyncMutex<()>>>>,
}

/// Held locks; released on drop.
#[derive(Debug)]
pub struct MedicineGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl MedicineLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a single medicine.
    pub async fn lock(&self, medicine_id: &MedicineId) -> MedicineGuard {
        self.lock_many(std::iter::once(medicine_id)).await
    }

    /// Lock several medicines in ascending ID order. Duplicates are locked once.
    pub async fn lock_many<'a, I>(&self, medicine_ids: I) -> MedicineGuard
    where
        I: IntoIterator<Item = &'a MedicineId>,
    {
        let ordered: BTreeSet<&MedicineId> = medicine_ids.into_iter().collect();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            ordered
                .into_iter()
                .map(|id| Arc::clone(map.entry(id.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }

        MedicineGuard { _guards: guards }
    }
}
