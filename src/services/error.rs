//! Service-layer error type: the five error kinds surfaced to callers.

use crate::db::repository::RepositoryError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the service layer.
///
/// Every variant except `Transient` and `Internal` is a deterministic
/// outcome of the request against current state; `Transient` is retryable
/// by the caller.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The identified entity is absent.
    #[error("{0}")]
    NotFound(String),

    /// The request is structurally malformed or violates a field constraint.
    #[error("{0}")]
    Validation(String),

    /// The target entity is in a state that forbids the operation.
    #[error("{0}")]
    StateRejection(String),

    /// The solver could not place a job without hard violations within
    /// the budget.
    #[error("{message}")]
    Infeasible {
        message: String,
        violations: Vec<String>,
    },

    /// Database contention, pool exhaustion, timeout. Retryable.
    #[error("{0}")]
    Transient(String),

    /// Unexpected fault.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn infeasible(message: impl Into<String>, violations: Vec<String>) -> Self {
        Self::Infeasible {
            message: message.into(),
            violations,
        }
    }

    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Validation(_) => "VALIDATION",
            ServiceError::StateRejection(_) => "STATE_REJECTION",
            ServiceError::Infeasible { .. } => "INFEASIBLE",
            ServiceError::Transient(_) => "TRANSIENT",
            ServiceError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::NotFound { .. } => ServiceError::NotFound(err.to_string()),
            RepositoryError::ValidationError { .. } => ServiceError::Validation(err.to_string()),
            RepositoryError::StateRejection { .. } => ServiceError::StateRejection(err.to_string()),
            RepositoryError::ConnectionError { .. } | RepositoryError::TimeoutError { .. } => {
                ServiceError::Transient(err.to_string())
            }
            _ if err.is_retryable() => ServiceError::Transient(err.to_string()),
            _ => ServiceError::Internal(err.to_string()),
        }
    }
}
