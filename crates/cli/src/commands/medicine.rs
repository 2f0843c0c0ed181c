//! Medicine master list commands.
//!
//! # Import File Format
//!
//! ```yaml
//! medicines:
//!   - id: PARA500
//!     name: Paracetamol 500 mg
//!     unit: tablet
//!     category: essential_drug   # or non_essential_drug, medical_supply
//!     min_stock: 100
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use clinic_stock_core::{MedicineCategory, MedicineId};
use clinic_stock_server::models::{CreateMedicineInput, MedicineFilter, RequestContext};
use clinic_stock_server::services::{InventoryError, InventoryService};

use super::CliError;

/// Top level of a medicine import file.
#[derive(Debug, Deserialize)]
pub struct ImportFile {
    pub medicines: Vec<CreateMedicineInput>,
}

/// What an import did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    /// Codes already on the master list.
    pub skipped: Vec<MedicineId>,
}

/// Fields for `medicine add`.
#[derive(Debug)]
pub struct NewMedicine {
    pub id: MedicineId,
    pub name: String,
    pub unit: String,
    pub category: MedicineCategory,
    pub min_stock: i64,
}

/// Import medicines from YAML text. Existing codes are skipped, not updated.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or a medicine is rejected for
/// any reason other than already existing.
pub async fn import(
    service: &InventoryService,
    yaml: &str,
    ctx: &RequestContext,
) -> Result<ImportSummary, CliError> {
    let file: ImportFile = serde_yaml::from_str(yaml)?;
    info!(medicines = file.medicines.len(), "Parsed import file");

    let mut summary = ImportSummary::default();
    for input in file.medicines {
        let id = input.id.clone();
        match service.create_medicine(input, ctx).await {
            Ok(_) => summary.created += 1,
            Err(InventoryError::MedicineExists(_)) => {
                warn!(medicine_id = %id, "Already on the master list, skipping");
                summary.skipped.push(id);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

/// Import medicines from a YAML file and print a summary.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the import fails.
pub async fn import_file(
    service: &InventoryService,
    path: &str,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let content = tokio::fs::read_to_string(Path::new(path))
        .await
        .map_err(|source| CliError::Io {
            path: path.to_owned(),
            source,
        })?;

    let summary = import(service, &content, ctx).await?;

    #[allow(clippy::print_stdout)]
    {
        println!(
            "Imported {} medicines ({} already present)",
            summary.created,
            summary.skipped.len()
        );
    }
    Ok(())
}

/// Print the master list.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list(service: &InventoryService, include_inactive: bool) -> Result<(), CliError> {
    let medicines = service
        .list_medicines(MedicineFilter { include_inactive })
        .await?;

    #[allow(clippy::print_stdout)]
    for m in &medicines {
        println!(
            "{:<12} {:<32} {:<10} {:<20} min {:>6}{}",
            m.id.as_str(),
            m.name,
            m.unit,
            m.category.as_str(),
            m.min_stock,
            if m.is_active { "" } else { "  (inactive)" }
        );
    }
    Ok(())
}

/// Add one medicine.
///
/// # Errors
///
/// Returns an error if the medicine is rejected.
pub async fn add(
    service: &InventoryService,
    medicine: NewMedicine,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    let created = service
        .create_medicine(
            CreateMedicineInput {
                id: medicine.id,
                name: medicine.name,
                unit: medicine.unit,
                category: medicine.category,
                min_stock: medicine.min_stock,
            },
            ctx,
        )
        .await?;

    info!(medicine_id = %created.id, "Medicine added");
    Ok(())
}

/// Deactivate or reactivate a medicine.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the medicine is unknown.
pub async fn set_active(
    service: &InventoryService,
    id: &MedicineId,
    active: bool,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    if active {
        service.reactivate_medicine(id, ctx).await?;
    } else {
        service.deactivate_medicine(id, ctx).await?;
    }
    info!(medicine_id = %id, active, "Medicine status set");
    Ok(())
}

/// Delete a medicine with no stock history.
///
/// # Errors
///
/// Returns an error if the caller is not an admin or the medicine has history.
pub async fn delete(
    service: &InventoryService,
    id: &MedicineId,
    ctx: &RequestContext,
) -> Result<(), CliError> {
    service.delete_medicine(id, ctx).await?;
    info!(medicine_id = %id, "Medicine deleted");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use clinic_stock_server::clock::FixedClock;
    use clinic_stock_server::config::InventorySettings;
    use clinic_stock_server::db::MemoryInventoryStore;

    use super::*;

    const MASTER_LIST: &str = r"
medicines:
  - id: PARA500
    name: Paracetamol 500 mg
    unit: tablet
    min_stock: 100
  - id: GAUZE
    name: Sterile gauze
    unit: pack
    category: medical_supply
";

    fn service() -> InventoryService {
        InventoryService::new(
            Arc::new(MemoryInventoryStore::new()),
            Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())),
            InventorySettings::default(),
        )
    }

    #[tokio::test]
    async fn test_import_creates_then_skips() {
        let service = service();
        let ctx = RequestContext::staff("cli");

        let first = import(&service, MASTER_LIST, &ctx).await.unwrap();
        let second = import(&service, MASTER_LIST, &ctx).await.unwrap();

        assert_eq!(first.created, 2);
        assert!(first.skipped.is_empty());
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped.len(), 2);

        let gauze = service
            .get_medicine(&MedicineId::parse("GAUZE").unwrap())
            .await
            .unwrap();
        assert_eq!(gauze.category, MedicineCategory::MedicalSupply);
        assert_eq!(gauze.min_stock, 0);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_yaml() {
        let err = import(&service(), "medicines: nope", &RequestContext::staff("cli"))
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Yaml(_)));
    }
}
