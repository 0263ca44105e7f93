//! # FieldOps Backend
//!
//! Scheduling and dispatch core for a field-service business: turns a
//! pool of unscheduled jobs and a roster of staff with calendar
//! availability into a day-level plan of appointments, reacts to live
//! disturbances (emergency insertions, staff absences, cancellations),
//! and keeps every destructive change auditable.
//!
//! ## Architecture
//!
//! - [`api`]: identifier newtypes and shared value types
//! - [`models`]: domain entities and status state machines
//! - [`scheduler`]: pure route-optimization core (travel oracle,
//!   constraint evaluator, metaheuristic solver, single-job insertion)
//! - [`services`]: business logic orchestrating repository + solver
//! - [`db`]: repository pattern with in-memory and Postgres backends
//! - [`http`]: axum REST surface (feature `http-server`)
//!
//! The solver is pure: it takes an immutable snapshot and returns an
//! immutable solution; persistence happens in the service layer inside
//! per-date transactional mutations.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod scheduler;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use db::{get_repository, init_repository};
