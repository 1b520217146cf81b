//! API error handling
//!
//! Maps the engine's error taxonomy onto HTTP: validation failures are 422,
//! conflicts (duplicate active plan, cancellation with payments, open
//! obligations) are 409, missing organization context is 401. Structured
//! detail rides along in `details` so callers can present a specific
//! remediation.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_billing::BillingError;
use domain_enrollment::EnrollmentError;
use domain_reconciliation::ReconciliationError;
use infra_db::DatabaseError;

use crate::auth::AuthError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Conflict: {message}")]
    ConflictWithDetails {
        message: String,
        details: serde_json::Value,
    },

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ConflictWithDetails { message, details } => {
                (StatusCode::CONFLICT, "conflict", message, Some(details))
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg,
                None,
            ),
            ApiError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg,
                None,
            ),
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg, None)
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match &err {
            DatabaseError::NotFound(msg) => ApiError::NotFound(msg.clone()),
            DatabaseError::DuplicateEntry(msg) | DatabaseError::ConstraintViolation(msg) => {
                ApiError::Conflict(msg.clone())
            }
            DatabaseError::ForeignKeyViolation(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match &err {
            BillingError::InvalidPlanParameters(_)
            | BillingError::InvalidPaymentAmount(_)
            | BillingError::Money(_)
            | BillingError::Temporal(_) => ApiError::Validation(err.to_string()),
            BillingError::DuplicateActivePlan { .. }
            | BillingError::PlanHasPayments { .. }
            | BillingError::AmountMismatch { .. }
            | BillingError::ItemAlreadyPaid(_)
            | BillingError::InvalidOperation(_) => ApiError::Conflict(err.to_string()),
            BillingError::ScheduleItemNotFound(_)
            | BillingError::PaymentNotFound(_)
            | BillingError::PlanNotFound(_) => ApiError::NotFound(err.to_string()),
        }
    }
}

impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::InvalidAttendanceWindow { .. } => {
                ApiError::Validation(err.to_string())
            }
            EnrollmentError::ActiveFinancialObligations(detail) => {
                let details = serde_json::to_value(&detail)
                    .unwrap_or(serde_json::Value::Null);
                ApiError::ConflictWithDetails {
                    message: format!("Active financial obligations: {detail}"),
                    details,
                }
            }
            EnrollmentError::InvalidStateTransition { .. } => ApiError::Conflict(err.to_string()),
            EnrollmentError::AttendanceNotFound(_) => ApiError::NotFound(err.to_string()),
            EnrollmentError::Money(_) => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<ReconciliationError> for ApiError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::InvalidParameters(msg) => ApiError::BadRequest(msg),
            ReconciliationError::Directory(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(_: AuthError) -> Self {
        ApiError::Unauthorized
    }
}

impl From<core_kernel::CoreError> for ApiError {
    fn from(err: core_kernel::CoreError) -> Self {
        use core_kernel::CoreError;
        match &err {
            CoreError::Money(_) | CoreError::Temporal(_) | CoreError::Validation(_) => {
                ApiError::Validation(err.to_string())
            }
            CoreError::InvalidStateTransition(_) => ApiError::Conflict(err.to_string()),
            CoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::Configuration(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<core_kernel::PortError> for ApiError {
    fn from(err: core_kernel::PortError) -> Self {
        use core_kernel::PortError;
        match &err {
            PortError::Unauthorized { .. } => ApiError::Unauthorized,
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            PortError::Validation { .. } => ApiError::Validation(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
