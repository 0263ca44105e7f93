//! Business logic orchestrating the repository and the scheduling core.
//!
//! Services are constructed per request around an `Arc<dyn FullRepository>`
//! and the travel oracle; they load an immutable snapshot, run the pure
//! solver code, and persist results through one transactional repository
//! call.

pub mod conflict_resolution;
pub mod emergency;
pub mod error;
pub mod invoices;
pub mod jobs;
pub mod leads;
pub mod reassignment;
pub mod schedule_clear;
pub mod schedule_generation;
pub mod snapshot;

pub use conflict_resolution::ConflictResolutionService;
pub use emergency::EmergencyService;
pub use error::{ServiceError, ServiceResult};
pub use invoices::InvoiceService;
pub use jobs::JobService;
pub use leads::LeadService;
pub use reassignment::ReassignmentService;
pub use schedule_clear::ScheduleClearService;
pub use schedule_generation::ScheduleGenerationService;
