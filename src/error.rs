use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{coach::CoachRuleError, join_requests::JoinRuleError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("invalid input: {0}")]
    Validation(String),
    /// The caller asked for something the domain never allows.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Caller identity does not have the required role on the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Business rule violation: capacity, overlap, lifecycle state, duplicates.
    #[error("conflict: {0}")]
    Conflict(String),
    /// No caller identity was supplied.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// A storage call failed; the write may or may not have been applied.
    #[error("storage failure")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionConflict { .. } => {
                ServiceError::Conflict("resource was modified concurrently; retry".into())
            }
            StorageError::Duplicate { message } => ServiceError::Conflict(message),
            unavailable @ StorageError::Unavailable { .. } => ServiceError::Storage(unavailable),
        }
    }
}

impl From<JoinRuleError> for ServiceError {
    fn from(err: JoinRuleError) -> Self {
        let message = err.to_string();
        match err {
            JoinRuleError::HostCannotJoin => ServiceError::InvalidOperation(message),
            JoinRuleError::NotHost => ServiceError::Forbidden(message),
            JoinRuleError::RequestNotFound(_) => ServiceError::NotFound(message),
            JoinRuleError::NotOpenForJoin
            | JoinRuleError::NotOpen(_)
            | JoinRuleError::AlreadyStarted
            | JoinRuleError::AlreadyPending
            | JoinRuleError::AlreadyApproved
            | JoinRuleError::PreviouslyRejected
            | JoinRuleError::NotPending(_)
            | JoinRuleError::GameFull
            | JoinRuleError::Overlap(_)
            | JoinRuleError::CannotCancel(_)
            | JoinRuleError::CancellationCutoff { .. } => ServiceError::Conflict(message),
        }
    }
}

impl From<CoachRuleError> for ServiceError {
    fn from(err: CoachRuleError) -> Self {
        let message = err.to_string();
        match err {
            CoachRuleError::InvalidWindow => ServiceError::Validation(message),
            CoachRuleError::OwnSlot => ServiceError::InvalidOperation(message),
            CoachRuleError::SlotNotFound(_) | CoachRuleError::BookingNotFound(_) => {
                ServiceError::NotFound(message)
            }
            CoachRuleError::NotSlotOwner | CoachRuleError::NotBookingCoach => {
                ServiceError::Forbidden(message)
            }
            CoachRuleError::DuplicateSlot
            | CoachRuleError::SlotAlreadyBooked
            | CoachRuleError::SlotUnavailable
            | CoachRuleError::SlotBooked
            | CoachRuleError::AlreadyRequested(_)
            | CoachRuleError::NotPending(_)
            | CoachRuleError::Overlap(_) => ServiceError::Conflict(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request: invalid input or a violated business rule.
    #[error("{0}")]
    BadRequest(String),
    /// Missing caller identity.
    #[error("{0}")]
    Unauthorized(String),
    /// Caller is not allowed to act on the resource.
    #[error("{0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message)
            | ServiceError::InvalidOperation(message)
            | ServiceError::Conflict(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Storage(source) => {
                error!(error = %source, "storage operation failed");
                AppError::Internal("storage operation failed; re-read before retrying".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            success: false,
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
