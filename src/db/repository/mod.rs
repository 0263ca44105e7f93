//! Repository traits: the abstract persistence interface.
//!
//! Implementations must be `Send + Sync`. Per-date schedule mutations go
//! through [`ScheduleRepository::apply_schedule_mutation`] and
//! [`ScheduleRepository::clear_day`], which implementations execute
//! atomically under a per-date lock: either every write in the batch
//! lands or none do, and invariants are checked before commit.

pub mod error;

use async_trait::async_trait;
use chrono::NaiveDate;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use crate::api::{
    AppointmentId, Cents, CustomerId, InvoiceId, JobId, LeadId, PropertyId, ServiceOfferingId,
    StaffId, WaitlistEntryId,
};
use crate::models::{
    Appointment, Customer, Invoice, Job, JobStatus, JobStatusHistory, Lead, PaymentMethod,
    Property, ScheduleClearAudit, ScheduleReassignment, SentMessage, ServiceOffering, Staff,
    StaffAvailability, WaitlistEntry,
};

/// A requested job status change, applied with history inside a batch.
#[derive(Debug, Clone)]
pub struct JobTransition {
    pub job_id: JobId,
    pub next_status: JobStatus,
    pub actor: Option<StaffId>,
    pub notes: Option<String>,
}

/// One atomic batch of writes against a single date's schedule.
///
/// The empty batch is a no-op. Implementations validate every job
/// transition and the schedule invariants (no double-booking, equipment
/// compatibility, windows) before committing.
#[derive(Debug, Clone, Default)]
pub struct ScheduleMutation {
    /// Appointments to mark cancelled, with the reason.
    pub cancel_appointments: Vec<(AppointmentId, String)>,
    /// Appointments to remove entirely (schedule regeneration).
    pub delete_appointments: Vec<AppointmentId>,
    pub insert_appointments: Vec<Appointment>,
    pub job_transitions: Vec<JobTransition>,
    pub add_waitlist: Vec<WaitlistEntry>,
    pub remove_waitlist: Vec<WaitlistEntryId>,
    /// Flip (staff, date) availability off before the rest of the batch.
    pub mark_staff_unavailable: Option<StaffId>,
    pub record_reassignment: Option<ScheduleReassignment>,
}

impl ScheduleMutation {
    pub fn is_empty(&self) -> bool {
        self.cancel_appointments.is_empty()
            && self.delete_appointments.is_empty()
            && self.insert_appointments.is_empty()
            && self.job_transitions.is_empty()
            && self.add_waitlist.is_empty()
            && self.remove_waitlist.is_empty()
            && self.mark_staff_unavailable.is_none()
            && self.record_reassignment.is_none()
    }
}

/// Customers, properties, and leads.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get_customer(&self, id: CustomerId) -> RepositoryResult<Customer>;
    async fn insert_customer(&self, customer: &Customer) -> RepositoryResult<()>;

    async fn get_property(&self, id: PropertyId) -> RepositoryResult<Property>;
    async fn insert_property(&self, property: &Property) -> RepositoryResult<()>;
    async fn list_customer_properties(&self, id: CustomerId) -> RepositoryResult<Vec<Property>>;

    /// Make `property_id` the customer's primary property, clearing the
    /// flag on every other property of the same customer atomically.
    async fn set_primary_property(
        &self,
        customer_id: CustomerId,
        property_id: PropertyId,
    ) -> RepositoryResult<()>;

    async fn get_lead(&self, id: LeadId) -> RepositoryResult<Lead>;
    async fn insert_lead(&self, lead: &Lead) -> RepositoryResult<()>;

    /// Convert a lead into a new customer. Rejects already-converted leads.
    async fn convert_lead(&self, id: LeadId, customer: &Customer) -> RepositoryResult<Customer>;
}

/// Service catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_offering(&self, id: ServiceOfferingId) -> RepositoryResult<ServiceOffering>;
    async fn insert_offering(&self, offering: &ServiceOffering) -> RepositoryResult<()>;
    async fn list_active_offerings(&self) -> RepositoryResult<Vec<ServiceOffering>>;
}

/// Staff roster and per-date availability.
#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn get_staff(&self, id: StaffId) -> RepositoryResult<Staff>;
    async fn insert_staff(&self, staff: &Staff) -> RepositoryResult<()>;

    /// All active staff with role `tech`, regardless of availability.
    async fn list_active_techs(&self) -> RepositoryResult<Vec<Staff>>;

    async fn get_availability(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<StaffAvailability>>;
    async fn upsert_availability(&self, availability: &StaffAvailability) -> RepositoryResult<()>;

    /// Active techs with an availability row for the date, marked
    /// available. Only role `tech` participates in routing.
    async fn list_available_staff(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<(Staff, StaffAvailability)>>;
}

/// Jobs and the append-only status history.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get_job(&self, id: JobId) -> RepositoryResult<Job>;
    async fn insert_job(&self, job: &Job) -> RepositoryResult<()>;
    async fn list_jobs_by_status(&self, status: JobStatus) -> RepositoryResult<Vec<Job>>;

    /// Apply a single status transition with a history entry, rejecting
    /// illegal moves.
    async fn transition_job(&self, transition: &JobTransition) -> RepositoryResult<Job>;

    /// Escalate (or lower) a job's priority, e.g. on emergency insertion.
    async fn set_job_priority(
        &self,
        id: JobId,
        priority: crate::models::JobPriority,
    ) -> RepositoryResult<()>;

    async fn fetch_status_history(&self, id: JobId) -> RepositoryResult<Vec<JobStatusHistory>>;
}

/// Appointments, the waitlist, and the per-date transactional mutations.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn get_appointment(&self, id: AppointmentId) -> RepositoryResult<Appointment>;
    async fn list_appointments_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>>;
    async fn list_staff_appointments(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>>;

    async fn list_waitlist_for_date(&self, date: NaiveDate)
        -> RepositoryResult<Vec<WaitlistEntry>>;

    /// Apply one atomic batch of writes for `date` under the per-date
    /// lock. On any error the whole batch rolls back.
    async fn apply_schedule_mutation(
        &self,
        date: NaiveDate,
        mutation: ScheduleMutation,
    ) -> RepositoryResult<()>;

    /// Snapshot and delete every appointment on `date`, reset the
    /// associated jobs to approved, and write one audit row. One
    /// transaction; returns the audit record.
    async fn clear_day(
        &self,
        date: NaiveDate,
        cleared_by: Option<StaffId>,
        notes: Option<String>,
    ) -> RepositoryResult<ScheduleClearAudit>;

    async fn get_clear_audit(
        &self,
        id: crate::api::ClearAuditId,
    ) -> RepositoryResult<ScheduleClearAudit>;
    async fn list_recent_clears(&self, limit: usize)
        -> RepositoryResult<Vec<ScheduleClearAudit>>;
    async fn list_reassignments(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleReassignment>>;
}

/// Invoices and lien tracking.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn get_invoice(&self, id: InvoiceId) -> RepositoryResult<Invoice>;
    async fn insert_invoice(&self, invoice: &Invoice) -> RepositoryResult<()>;
    async fn update_invoice(&self, invoice: &Invoice) -> RepositoryResult<()>;

    /// Record a payment atomically: bumps `paid_amount`, sets the status
    /// to partially_paid or paid, rejects overpayment.
    async fn record_payment(
        &self,
        id: InvoiceId,
        amount: Cents,
        method: PaymentMethod,
    ) -> RepositoryResult<Invoice>;

    /// Open, lien-eligible invoices whose warning is due as of `today`.
    async fn list_lien_warning_due(&self, today: NaiveDate) -> RepositoryResult<Vec<Invoice>>;

    /// Highest invoice sequence already used for `year`.
    async fn last_invoice_sequence(&self, year: i32) -> RepositoryResult<u32>;
}

/// Outbound message log.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert_sent_message(&self, message: &SentMessage) -> RepositoryResult<()>;
}

/// The complete persistence interface used by the service layer.
#[async_trait]
pub trait FullRepository:
    CustomerRepository
    + CatalogRepository
    + StaffRepository
    + JobRepository
    + ScheduleRepository
    + InvoiceRepository
    + MessageRepository
{
    async fn health_check(&self) -> RepositoryResult<bool>;
}
