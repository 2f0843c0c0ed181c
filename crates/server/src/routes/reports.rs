//! Report handlers.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{AuditDiscrepancy, LowStockItem, NearExpiryItem, ReportMonth, StockSummary},
    state::AppState,
};

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/low-stock", get(low_stock))
        .route("/api/reports/near-expiry", get(near_expiry))
        .route("/api/reports/summary", get(summary))
        .route("/api/reports/monthly", get(monthly))
        .route("/api/reports/audit", get(audit))
}

/// Query parameters for the near-expiry report.
#[derive(Debug, Default, Deserialize)]
pub struct NearExpiryQuery {
    /// Horizon in days; defaults to the configured alert horizon.
    pub days: Option<u32>,
}

/// Query parameters for the monthly report.
#[derive(Debug, Default, Deserialize)]
pub struct MonthlyQuery {
    /// Month as `YYYY-MM`; defaults to the previous month.
    pub month: Option<String>,
    /// `json` (default) or `text`.
    pub format: Option<String>,
}

async fn low_stock(State(state): State<AppState>) -> Result<Json<Vec<LowStockItem>>, AppError> {
    Ok(Json(state.inventory().low_stock_report().await?))
}

async fn near_expiry(
    State(state): State<AppState>,
    Query(query): Query<NearExpiryQuery>,
) -> Result<Json<Vec<NearExpiryItem>>, AppError> {
    Ok(Json(state.inventory().near_expiry_report(query.days).await?))
}

async fn summary(State(state): State<AppState>) -> Result<Json<StockSummary>, AppError> {
    Ok(Json(state.inventory().stock_summary().await?))
}

/// Monthly report as JSON, or as the plain-text rendering with `format=text`.
async fn monthly(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Response, AppError> {
    let month = query
        .month
        .as_deref()
        .map(ReportMonth::parse)
        .transpose()
        .map_err(AppError::BadRequest)?;

    match query.format.as_deref() {
        None | Some("json") => Ok(Json(state.inventory().monthly_report(month).await?).into_response()),
        Some("text") => Ok(state
            .inventory()
            .monthly_report_text(month)
            .await?
            .into_response()),
        Some(other) => Err(AppError::BadRequest(format!(
            "unknown format `{other}`; expected `json` or `text`"
        ))),
    }
}

async fn audit(State(state): State<AppState>) -> Result<Json<Vec<AuditDiscrepancy>>, AppError> {
    Ok(Json(state.inventory().audit_ledger().await?))
}
