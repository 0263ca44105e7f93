//! Route optimization core.
//!
//! A persistence-free solver over an immutable day snapshot: the travel
//! oracle, the constraint evaluator, the construction + local-search
//! optimizer, and the single-job insertion used by emergency dispatch.
//! Persistence happens in the service layer; everything here takes inputs
//! and returns values.

pub mod constraints;
pub mod domain;
pub mod insertion;
pub mod solver;
pub mod travel;

pub use constraints::{evaluate, Score};
pub use domain::{
    minutes_to_time, time_to_minutes, Minute, PlannedVisit, ScheduleSolution, SolverInput,
    SolverJob, SolverStaff, StaffRoute, UnassignedJob, UnassignedReason,
};
pub use insertion::{best_insertion, displacement_insertion, Insertion};
pub use solver::{solve, SolverParams};
pub use travel::{CachedEstimator, GreatCircleEstimator, TravelTimeEstimator};
