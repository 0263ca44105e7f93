//! Axum-based HTTP server exposing the scheduling core as a REST API.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use auth::{AuthError, AuthVerifier};
pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;
