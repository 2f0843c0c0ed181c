//! Medicine master-data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clinic_stock_core::{MedicineCategory, MedicineId};

/// A medicine or supply item on the clinic's master list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    /// Master-list code.
    pub id: MedicineId,
    /// Generic (display) name.
    pub name: String,
    /// Unit of measure (tablet, bottle, tube, ...).
    pub unit: String,
    /// Drug or supply category.
    pub category: MedicineCategory,
    /// Reorder point: flagged as low stock at or below this quantity.
    pub min_stock: i64,
    /// Inactive medicines are kept for history but cannot be moved.
    pub is_active: bool,
    /// When the medicine was created.
    pub created_at: DateTime<Utc>,
    /// When the medicine was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a medicine to the master list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicineInput {
    /// Master-list code.
    pub id: MedicineId,
    /// Generic (display) name.
    pub name: String,
    /// Unit of measure.
    pub unit: String,
    /// Drug or supply category.
    #[serde(default)]
    pub category: MedicineCategory,
    /// Reorder point.
    #[serde(default)]
    pub min_stock: i64,
}

/// Input for updating a medicine. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicineInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub category: Option<MedicineCategory>,
    pub min_stock: Option<i64>,
}

/// Filter criteria for listing medicines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedicineFilter {
    /// Include deactivated medicines.
    pub include_inactive: bool,
}

impl MedicineFilter {
    /// Active medicines only.
    #[must_use]
    pub const fn active() -> Self {
        Self {
            include_inactive: false,
        }
    }

    /// Every medicine, active or not.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            include_inactive: true,
        }
    }
}
