//! Stock movement handlers: receiving, opening balances and dispensing.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};

use crate::{
    error::AppError,
    middleware::Actor,
    models::{BatchDispenseOutcome, DispenseRequest, OpeningBalanceInput, ReceiveInput, ReceiveOutcome},
    state::AppState,
};

/// Build the stock router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stock/receive", post(receive))
        .route("/api/stock/opening-balance", post(opening_balance))
        .route("/api/stock/dispense", post(dispense))
}

/// Receive a delivery into a lot.
async fn receive(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Json(input): Json<ReceiveInput>,
) -> Result<(StatusCode, Json<ReceiveOutcome>), AppError> {
    let outcome = state.inventory().receive(input, &ctx).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn opening_balance(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Json(input): Json<OpeningBalanceInput>,
) -> Result<(StatusCode, Json<ReceiveOutcome>), AppError> {
    let outcome = state
        .inventory()
        .record_opening_balance(input, &ctx)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Dispense one or more lines; either every line is met or nothing changes.
async fn dispense(
    Actor(ctx): Actor,
    State(state): State<AppState>,
    Json(request): Json<DispenseRequest>,
) -> Result<Json<BatchDispenseOutcome>, AppError> {
    Ok(Json(state.inventory().dispense_batch(request, &ctx).await?))
}
