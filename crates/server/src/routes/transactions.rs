//! Ledger correction handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::patch,
};

use clinic_stock_core::TransactionId;

use crate::{
    error::AppError,
    middleware::Actor,
    models::{EditTransactionInput, Transaction},
    state::AppState,
};

/// Build the transactions router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/transactions/{id}", patch(edit).delete(remove))
}

/// Edit an entry's quantity and/or note; the lot moves with it.
async fn edit(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
    Json(input): Json<EditTransactionInput>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.inventory().edit_transaction(id, input, &ctx).await?))
}

/// Delete an entry and reverse its effect on the lot. Returns the deleted entry.
async fn remove(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Path(id): Path<TransactionId>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.inventory().delete_transaction(id, &ctx).await?))
}
