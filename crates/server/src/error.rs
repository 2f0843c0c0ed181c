//! Unified error handling for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::InventoryError;

/// Application-level error type returned by route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Inventory operation failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Caller identity is missing or malformed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Inventory(err) => match err {
                InventoryError::InsufficientStock { .. }
                | InventoryError::DuplicateLot { .. }
                | InventoryError::Reconciliation(_)
                | InventoryError::MedicineInactive(_)
                | InventoryError::MedicineInUse(_)
                | InventoryError::MedicineExists(_) => StatusCode::CONFLICT,
                InventoryError::Permission(_) => StatusCode::FORBIDDEN,
                InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
                InventoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                InventoryError::NegativeStock { .. } | InventoryError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Stock request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
