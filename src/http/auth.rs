//! Actor resolution for audit attribution.
//!
//! Authentication itself is an external collaborator; the core consumes
//! it through this one capability: map a bearer token to the acting
//! staff id. Without a verifier configured (local development) requests
//! are anonymous and audit fields stay empty.

use axum::http::HeaderMap;

use crate::api::StaffId;

/// Verifies a bearer token and yields the acting staff.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, bearer_token: &str) -> Result<StaffId, AuthError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    Expired,
}

/// Extract the actor from the Authorization header, if a verifier is
/// configured. A missing header is anonymous, not an error; a present
/// but invalid token is reported.
pub fn resolve_actor(
    verifier: Option<&dyn AuthVerifier>,
    headers: &HeaderMap,
) -> Result<Option<StaffId>, AuthError> {
    let Some(verifier) = verifier else {
        return Ok(None);
    };
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthError::InvalidToken)?;
    verifier.verify(token).map(Some)
}
