//! Medicine master data and per-medicine stock views.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use clinic_stock_core::MedicineId;

use crate::{
    error::AppError,
    middleware::Actor,
    models::{CreateMedicineInput, LedgerLine, Lot, Medicine, MedicineFilter, UpdateMedicineInput},
    state::AppState,
};

/// Build the medicines router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/medicines", get(list).post(create))
        .route(
            "/api/medicines/{id}",
            get(show).patch(update).delete(remove),
        )
        .route("/api/medicines/{id}/deactivate", post(deactivate))
        .route("/api/medicines/{id}/reactivate", post(reactivate))
        .route("/api/medicines/{id}/lots", get(lots))
        .route("/api/medicines/{id}/ledger", get(ledger))
}

/// Query parameters for listing medicines.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// List medicines ordered by ID.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Medicine>>, AppError> {
    let filter = MedicineFilter {
        include_inactive: query.include_inactive,
    };
    Ok(Json(state.inventory().list_medicines(filter).await?))
}

/// Create a medicine.
async fn create(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Json(input): Json<CreateMedicineInput>,
) -> Result<(StatusCode, Json<Medicine>), AppError> {
    let medicine = state.inventory().create_medicine(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<Json<Medicine>, AppError> {
    Ok(Json(state.inventory().get_medicine(&id).await?))
}

async fn update(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
    Json(input): Json<UpdateMedicineInput>,
) -> Result<Json<Medicine>, AppError> {
    Ok(Json(state.inventory().update_medicine(&id, input, &ctx).await?))
}

/// Hard-delete a medicine that has no lots or ledger entries.
async fn remove(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<StatusCode, AppError> {
    state.inventory().delete_medicine(&id, &ctx).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deactivate(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<Json<Medicine>, AppError> {
    Ok(Json(state.inventory().deactivate_medicine(&id, &ctx).await?))
}

async fn reactivate(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<Json<Medicine>, AppError> {
    Ok(Json(state.inventory().reactivate_medicine(&id, &ctx).await?))
}

/// Every lot of the medicine in FEFO order, consumed lots included.
async fn lots(
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<Json<Vec<Lot>>, AppError> {
    let inventory = state.inventory();
    inventory.get_medicine(&id).await?;
    Ok(Json(inventory.lots_for_medicine(&id).await?))
}

async fn ledger(
    State(state): State<AppState>,
    Path(id): Path<MedicineId>,
) -> Result<Json<Vec<LedgerLine>>, AppError> {
    Ok(Json(state.inventory().ledger_history(&id).await?))
}
