//! Router configuration for the HTTP API.
//!
//! This module sets up all routes and middleware (CORS, compression,
//! tracing), and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Schedule generation
        .route("/schedule/generate", post(handlers::generate_schedule))
        .route("/schedule/capacity", get(handlers::get_capacity))
        .route("/schedule/emergency-insert", post(handlers::emergency_insert))
        .route("/schedule/reoptimize", post(handlers::reoptimize_schedule))
        // Conflict resolution
        .route("/appointments/{id}/cancel", post(handlers::cancel_appointment))
        .route("/appointments/{id}/reschedule", post(handlers::reschedule_appointment))
        .route("/schedule/waitlist", get(handlers::get_waitlist))
        .route("/schedule/fill-gap", post(handlers::fill_gap))
        // Staff reassignment
        .route("/staff/{id}/mark-unavailable", post(handlers::mark_staff_unavailable))
        .route("/schedule/reassign-staff", post(handlers::reassign_staff))
        .route("/schedule/coverage-options/{date}", get(handlers::get_coverage_options))
        // Clear and audit
        .route("/schedule/clear", post(handlers::clear_schedule))
        .route("/schedule/clears/recent", get(handlers::recent_clears));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo =
            Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo);
        let _router = create_router(state);
        // If we got here, router was created successfully
    }
}
