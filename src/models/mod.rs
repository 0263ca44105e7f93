//! Domain model for the scheduling and dispatch core.
//!
//! Entities are plain records; enum-typed columns are tagged Rust enums
//! (see [`enums`]). Validation helpers that belong to the schema layer
//! (phone normalization, zip validation) live in [`contact`].

pub mod appointment;
pub mod audit;
pub mod catalog;
pub mod contact;
pub mod customer;
pub mod enums;
pub mod invoice;
pub mod job;
pub mod macros;
pub mod staff;

pub use appointment::{Appointment, WaitlistEntry};
pub use audit::{
    ScheduleClearAudit, ScheduleReassignment, ScheduleSnapshot, SentMessage, SnapshotAppointment,
    SNAPSHOT_VERSION,
};
pub use catalog::ServiceOffering;
pub use customer::{Customer, Lead, Property};
pub use enums::{
    AppointmentStatus, InvoiceStatus, JobCategory, JobStatus, LeadSource, PaymentMethod,
    PricingModel, PropertyType, StaffRole, SystemType,
};
pub use invoice::Invoice;
pub use job::{Job, JobPriority, JobStatusHistory};
pub use staff::{Staff, StaffAvailability};
