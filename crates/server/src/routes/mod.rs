//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Readiness check (store reachable)
//!
//! # Medicines (master data)
//! GET    /api/medicines?include_inactive= - List medicines
//! POST   /api/medicines                   - Create medicine
//! GET    /api/medicines/{id}              - Get medicine
//! PATCH  /api/medicines/{id}              - Update medicine (admin)
//! DELETE /api/medicines/{id}              - Delete medicine without history (admin)
//! POST   /api/medicines/{id}/deactivate   - Deactivate (admin)
//! POST   /api/medicines/{id}/reactivate   - Reactivate (admin)
//! GET    /api/medicines/{id}/lots         - Lots in FEFO order
//! GET    /api/medicines/{id}/ledger       - Ledger with running balance
//!
//! # Stock movements
//! POST   /api/stock/receive               - Receive a lot
//! POST   /api/stock/opening-balance       - Load an opening balance (admin)
//! POST   /api/stock/dispense              - Dispense one or more lines (FEFO)
//!
//! # Ledger corrections
//! PATCH  /api/transactions/{id}           - Edit quantity and/or note
//! DELETE /api/transactions/{id}           - Delete and reverse an entry
//!
//! # Reports
//! GET    /api/reports/low-stock           - At or below reorder point
//! GET    /api/reports/near-expiry?days=   - Lots expiring within the horizon
//! GET    /api/reports/summary             - Dashboard summary
//! GET    /api/reports/monthly?month=      - Monthly report (JSON or text)
//! GET    /api/reports/audit               - Lots out of step with the ledger
//! ```
//!
//! Mutating routes require the `X-Actor` header (see [`crate::middleware::actor`]).

pub mod medicines;
pub mod reports;
pub mod stock;
pub mod transactions;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(medicines::router())
        .merge(stock::router())
        .merge(transactions::router())
        .merge(reports::router())
}

/// Build the complete application: health checks, API routes and request
/// tracing, bound to `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.inventory().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
