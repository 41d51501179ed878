//! Error handling for the Pharmacy Stock Management Platform
//!
//! Every error is reported synchronously to the caller with enough context
//! to render a user-facing message. `WriteConflict` is the only kind callers
//! are expected to retry; it is flagged as retryable in the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate batch number: {0}")]
    DuplicateBatchNumber(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Batch {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("Insufficient stock for medicine {medicine_id}: requested {requested}, available {available}")]
    InsufficientStock {
        medicine_id: i64,
        requested: i64,
        available: i64,
    },

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Set on errors the caller should retry automatically.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            field: None,
            retryable: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateBatchNumber(number) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some("batch_number".to_string()),
                    ..ErrorDetail::new(
                        "DUPLICATE_BATCH_NUMBER",
                        format!("A batch with number {} already exists", number),
                    )
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::AlreadyFinalized(number) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "ALREADY_FINALIZED",
                    format!("Batch {} is already finalized", number),
                ),
            ),
            AppError::InsufficientStock {
                medicine_id,
                requested,
                available,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "INSUFFICIENT_STOCK",
                    format!(
                        "Medicine {}: requested {} units but only {} available",
                        medicine_id, requested, available
                    ),
                ),
            ),
            AppError::WriteConflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    retryable: Some(true),
                    ..ErrorDetail::new("WRITE_CONFLICT", msg.clone())
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
