use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use songbid_core::error::CoreError;
use songbid_db::LedgerError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`LedgerError`] for domain errors and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An error from a bid ledger operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Ledger(ledger) => match ledger {
                LedgerError::Core(core) => classify_core_error(core),
                LedgerError::Timeout { operation } => {
                    tracing::warn!(operation, "Ledger deadline exceeded");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        "TIMEOUT",
                        format!("Operation '{operation}' timed out"),
                    )
                }
                LedgerError::Storage(err) if ledger.is_serialization_failure() => {
                    tracing::warn!(error = %err, "Serialization failure");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "SERIALIZATION_FAILURE",
                        "Concurrent update detected, retry the request".to_string(),
                    )
                }
                LedgerError::Storage(err) => classify_sqlx_error(err),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// Check constraint violations (`23514`) map to 400. Everything else maps
/// to 500 with a sanitized message. Serialization failures are handled by
/// the caller and map to 503: the request may be repeated.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23514") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Value violates check constraint: {constraint}"),
                );
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
