//! Status enums for ledger entries, medicines and staff.

use serde::{Deserialize, Serialize};

/// Kind of quantity change recorded in the ledger.
///
/// The kind fixes the sign of the delta: receipts add stock, dispensing
/// removes it. Opening balances loaded from legacy records may carry either
/// sign, and their magnitude can never be edited afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Receive,
    Dispense,
    Initial,
}

impl TransactionKind {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receive => "RECEIVE",
            Self::Dispense => "DISPENSE",
            Self::Initial => "INITIAL",
        }
    }

    /// Whether the quantity of an existing entry of this kind may be changed.
    #[must_use]
    pub const fn quantity_editable(self) -> bool {
        !matches!(self, Self::Initial)
    }

    /// Turn an unsigned quantity into the signed delta for this kind.
    ///
    /// `Initial` keeps the sign of `reference`, the delta the entry was
    /// originally recorded with.
    #[must_use]
    pub const fn signed(self, magnitude: i64, reference: i64) -> i64 {
        match self {
            Self::Receive => magnitude,
            Self::Dispense => -magnitude,
            Self::Initial => {
                if reference < 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVE" => Ok(Self::Receive),
            "DISPENSE" => Ok(Self::Dispense),
            "INITIAL" => Ok(Self::Initial),
            _ => Err(format!("invalid transaction kind: {s}")),
        }
    }
}

/// Master-list category of a medicine.
///
/// The first two are drugs (on and off the essential drug list); the last
/// covers non-drug medical supplies such as dressings and syringes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MedicineCategory {
    #[default]
    EssentialDrug,
    NonEssentialDrug,
    MedicalSupply,
}

impl MedicineCategory {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EssentialDrug => "essential_drug",
            Self::NonEssentialDrug => "non_essential_drug",
            Self::MedicalSupply => "medical_supply",
        }
    }

    /// Whether this category counts as a drug in reports.
    #[must_use]
    pub const fn is_drug(self) -> bool {
        matches!(self, Self::EssentialDrug | Self::NonEssentialDrug)
    }
}

impl std::fmt::Display for MedicineCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MedicineCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "essential_drug" => Ok(Self::EssentialDrug),
            "non_essential_drug" => Ok(Self::NonEssentialDrug),
            "medical_supply" => Ok(Self::MedicalSupply),
            _ => Err(format!("invalid medicine category: {s}")),
        }
    }
}

/// Staff role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    /// Records receipts and dispensing; may correct only their own entries.
    #[default]
    Staff,
    /// May correct any ledger entry and manage master data.
    Admin,
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Staff => write!(f, "staff"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid staff role: {s}")),
        }
    }
}
