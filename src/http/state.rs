//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::scheduler::travel::{CachedEstimator, GreatCircleEstimator, TravelTimeEstimator};

use super::auth::AuthVerifier;

/// Shared application state passed to all handlers.
///
/// Handlers construct their service objects per request from these
/// collaborators; the repository pool and the travel cache are the only
/// process-wide resources.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Travel-time oracle (cached great-circle by default)
    pub travel: Arc<dyn TravelTimeEstimator>,
    /// Optional bearer-token verifier for audit attribution
    pub auth: Option<Arc<dyn AuthVerifier>>,
}

impl AppState {
    /// Create application state with the default travel oracle.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        let travel: Arc<dyn TravelTimeEstimator> = Arc::new(CachedEstimator::new(Arc::new(
            GreatCircleEstimator::default(),
        )));
        Self {
            repository,
            travel,
            auth: None,
        }
    }

    pub fn with_travel(mut self, travel: Arc<dyn TravelTimeEstimator>) -> Self {
        self.travel = travel;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthVerifier>) -> Self {
        self.auth = Some(auth);
        self
    }
}
