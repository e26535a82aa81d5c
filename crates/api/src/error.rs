//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses are JSON bodies carrying the error kind and
//! whatever order or store context is known; storage diagnostics stay in logs.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use mercato_core::{OrderId, StoreId};

use crate::db::RepositoryError;
use crate::services::orders::OrderError;

/// Application-level error type for the order API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Read-side database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Malformed request body, path or query.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request names a store other than the caller's.
    #[error("Store {store_id} is not the caller's store")]
    ForeignStore {
        /// Store named in the request.
        store_id: StoreId,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_id: Option<StoreId>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Order(err) => match err {
                OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderError::NotAuthorizedOrNotFound { .. } => StatusCode::NOT_FOUND,
                OrderError::Integrity { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                OrderError::Storage { retryable: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
                OrderError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(RepositoryError::NotFound) | Self::ForeignStore { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Database(err) if err.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, kind, order_id, store_id) = match self {
            Self::Order(err) => match err {
                OrderError::Validation(msg) => (msg.clone(), err.kind(), None, None),
                OrderError::NotAuthorizedOrNotFound { order_id, store_id } => (
                    "Order not found".to_string(),
                    err.kind(),
                    Some(*order_id),
                    Some(*store_id),
                ),
                OrderError::Integrity { order_id, .. } => (
                    "Order data is inconsistent".to_string(),
                    err.kind(),
                    Some(*order_id),
                    None,
                ),
                OrderError::Storage { .. } => {
                    ("Storage unavailable".to_string(), err.kind(), None, None)
                }
            },
            Self::Database(RepositoryError::NotFound) => {
                ("Not found".to_string(), "not_found", None, None)
            }
            Self::Database(_) => ("Internal server error".to_string(), "storage_error", None, None),
            Self::BadRequest(msg) => (msg.clone(), "validation_error", None, None),
            Self::ForeignStore { store_id } => (
                "Store not found".to_string(),
                "not_authorized_or_not_found",
                None,
                Some(*store_id),
            ),
        };

        ErrorBody {
            error,
            kind,
            order_id,
            store_id,
            retryable: self.status_code() == StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
