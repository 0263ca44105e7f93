//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::ServiceError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// State-machine rejection (illegal transition, overlap)
    Conflict(String),
    /// Constraint-infeasible, with the violation list
    Unprocessable(String, Vec<String>),
    /// Retryable fault (pool exhaustion, contention, timeout)
    Transient(String),
    /// Internal server error
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("VALIDATION", msg))
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ApiError::new("STATE_REJECTION", msg))
            }
            AppError::Unprocessable(msg, violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("INFEASIBLE", msg).with_details(violations),
            ),
            AppError::Transient(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new("TRANSIENT", msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => AppError::NotFound(msg),
            ServiceError::Validation(msg) => AppError::BadRequest(msg),
            ServiceError::StateRejection(msg) => AppError::Conflict(msg),
            ServiceError::Infeasible { message, violations } => {
                AppError::Unprocessable(message, violations)
            }
            ServiceError::Transient(msg) => AppError::Transient(msg),
            ServiceError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
