//! In-memory repository for unit testing and local development.
//!
//! All state lives behind one `parking_lot::RwLock`. Reads take the read
//! lock; every schedule mutation takes the write lock for its whole
//! read-validate-write cycle, which over-serializes across dates compared
//! to the per-date advisory locks of the Postgres backend — harmless for
//! an in-process store. Mutations are staged on a clone of the state and
//! swapped in only after invariant validation, so a failed batch leaves
//! the store untouched.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::api::{
    AppointmentId, Cents, CustomerId, InvoiceId, JobId, LeadId, PropertyId, ServiceOfferingId,
    StaffId, WaitlistEntryId,
};
use crate::db::checksum::snapshot_checksum;
use crate::db::repository::{
    CatalogRepository, CustomerRepository, ErrorContext, FullRepository, InvoiceRepository,
    JobRepository, JobTransition, MessageRepository, RepositoryError, RepositoryResult,
    ScheduleMutation, ScheduleRepository, StaffRepository,
};
use crate::db::validation::{validate_day_state, DayState};
use crate::models::{
    Appointment, AppointmentStatus, Customer, Invoice, InvoiceStatus, Job, JobStatus,
    JobStatusHistory, Lead, PaymentMethod, Property, ScheduleClearAudit, ScheduleReassignment,
    ScheduleSnapshot, SentMessage, ServiceOffering, Staff, StaffAvailability, WaitlistEntry,
};

#[derive(Debug, Clone, Default)]
struct Inner {
    customers: HashMap<CustomerId, Customer>,
    properties: HashMap<PropertyId, Property>,
    leads: HashMap<LeadId, Lead>,
    offerings: HashMap<ServiceOfferingId, ServiceOffering>,
    staff: HashMap<StaffId, Staff>,
    availability: HashMap<(StaffId, NaiveDate), StaffAvailability>,
    jobs: HashMap<JobId, Job>,
    status_history: Vec<JobStatusHistory>,
    appointments: HashMap<AppointmentId, Appointment>,
    waitlist: HashMap<WaitlistEntryId, WaitlistEntry>,
    invoices: HashMap<InvoiceId, Invoice>,
    clear_audits: Vec<ScheduleClearAudit>,
    reassignments: Vec<ScheduleReassignment>,
    sent_messages: Vec<SentMessage>,
}

/// In-memory implementation of every repository trait.
#[derive(Default)]
pub struct LocalRepository {
    inner: RwLock<Inner>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(entity: &str, id: impl ToString) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("{} not found", entity),
        ErrorContext::default()
            .with_entity(entity)
            .with_entity_id(id),
    )
}

/// Apply one job transition on staged state, enforcing the legal graph.
fn stage_transition(inner: &mut Inner, transition: &JobTransition) -> RepositoryResult<()> {
    let job = inner
        .jobs
        .get_mut(&transition.job_id)
        .ok_or_else(|| not_found("job", transition.job_id))?;

    if job.status == transition.next_status {
        // Idempotent no-op; nothing to record.
        return Ok(());
    }
    if !job.status.can_transition_to(transition.next_status) {
        return Err(RepositoryError::state_rejection_with_context(
            format!(
                "illegal job transition {} -> {}",
                job.status, transition.next_status
            ),
            ErrorContext::new("transition_job")
                .with_entity("job")
                .with_entity_id(transition.job_id),
        ));
    }

    let entry = JobStatusHistory::record(
        job.id,
        Some(job.status),
        transition.next_status,
        transition.actor,
        transition.notes.clone(),
    );
    job.status = transition.next_status;
    job.updated_at = Utc::now();
    inner.status_history.push(entry);
    Ok(())
}

/// Check the schedule invariants over the staged state for one date.
fn validate_day(inner: &Inner, date: NaiveDate) -> RepositoryResult<()> {
    let appointments: Vec<Appointment> = inner
        .appointments
        .values()
        .filter(|a| a.date == date)
        .cloned()
        .collect();

    let mut live_counts: HashMap<JobId, usize> = HashMap::new();
    for appt in inner
        .appointments
        .values()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
    {
        *live_counts.entry(appt.job_id).or_default() += 1;
    }

    let state = DayState {
        date,
        appointments,
        jobs: inner.jobs.clone(),
        staff: inner.staff.clone(),
        availability: inner
            .availability
            .iter()
            .filter(|((_, d), _)| *d == date)
            .map(|((staff_id, _), av)| (*staff_id, av.clone()))
            .collect(),
        live_counts,
    };

    validate_day_state(&state).map_err(|message| {
        RepositoryError::state_rejection_with_context(message, ErrorContext::new("validate_day"))
    })
}

fn stage_mutation(
    inner: &mut Inner,
    date: NaiveDate,
    mutation: &ScheduleMutation,
) -> RepositoryResult<()> {
    if let Some(staff_id) = mutation.mark_staff_unavailable {
        let entry = inner
            .availability
            .entry((staff_id, date))
            .or_insert_with(|| StaffAvailability::standard_day(staff_id, date));
        entry.is_available = false;
    }

    for (appointment_id, reason) in &mutation.cancel_appointments {
        let appt = inner
            .appointments
            .get_mut(appointment_id)
            .ok_or_else(|| not_found("appointment", appointment_id))?;
        if !appt.status.is_cancellable() {
            return Err(RepositoryError::state_rejection_with_context(
                format!("appointment in status {} cannot be cancelled", appt.status),
                ErrorContext::new("cancel_appointment")
                    .with_entity("appointment")
                    .with_entity_id(*appointment_id),
            ));
        }
        appt.status = AppointmentStatus::Cancelled;
        appt.cancelled_at = Some(Utc::now());
        appt.cancellation_reason = Some(reason.clone());
        appt.updated_at = Utc::now();
    }

    for appointment_id in &mutation.delete_appointments {
        inner
            .appointments
            .remove(appointment_id)
            .ok_or_else(|| not_found("appointment", appointment_id))?;
    }

    for appt in &mutation.insert_appointments {
        if appt.date != date {
            return Err(RepositoryError::validation(format!(
                "appointment date {} does not match mutation date {}",
                appt.date, date
            )));
        }
        inner.appointments.insert(appt.id, appt.clone());
    }

    for transition in &mutation.job_transitions {
        stage_transition(inner, transition)?;
    }

    for entry in &mutation.add_waitlist {
        inner.waitlist.insert(entry.id, entry.clone());
    }
    for entry_id in &mutation.remove_waitlist {
        inner.waitlist.remove(entry_id);
    }

    if let Some(record) = &mutation.record_reassignment {
        inner.reassignments.push(record.clone());
    }

    validate_day(inner, date)
}

#[async_trait]
impl CustomerRepository for LocalRepository {
    async fn get_customer(&self, id: CustomerId) -> RepositoryResult<Customer> {
        self.inner
            .read()
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("customer", id))
    }

    async fn insert_customer(&self, customer: &Customer) -> RepositoryResult<()> {
        self.inner
            .write()
            .customers
            .insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_property(&self, id: PropertyId) -> RepositoryResult<Property> {
        self.inner
            .read()
            .properties
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("property", id))
    }

    async fn insert_property(&self, property: &Property) -> RepositoryResult<()> {
        property.validate().map_err(RepositoryError::validation)?;
        let mut inner = self.inner.write();
        if property.is_primary {
            for other in inner.properties.values_mut() {
                if other.customer_id == property.customer_id {
                    other.is_primary = false;
                }
            }
        }
        inner.properties.insert(property.id, property.clone());
        Ok(())
    }

    async fn list_customer_properties(&self, id: CustomerId) -> RepositoryResult<Vec<Property>> {
        Ok(self
            .inner
            .read()
            .properties
            .values()
            .filter(|p| p.customer_id == id)
            .cloned()
            .collect())
    }

    async fn set_primary_property(
        &self,
        customer_id: CustomerId,
        property_id: PropertyId,
    ) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        let target = inner
            .properties
            .get(&property_id)
            .ok_or_else(|| not_found("property", property_id))?;
        if target.customer_id != customer_id {
            return Err(RepositoryError::state_rejection(
                "property belongs to a different customer",
            ));
        }
        for property in inner.properties.values_mut() {
            if property.customer_id == customer_id {
                property.is_primary = property.id == property_id;
                property.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn get_lead(&self, id: LeadId) -> RepositoryResult<Lead> {
        self.inner
            .read()
            .leads
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("lead", id))
    }

    async fn insert_lead(&self, lead: &Lead) -> RepositoryResult<()> {
        self.inner.write().leads.insert(lead.id, lead.clone());
        Ok(())
    }

    async fn convert_lead(&self, id: LeadId, customer: &Customer) -> RepositoryResult<Customer> {
        let mut inner = self.inner.write();
        let lead = inner.leads.get_mut(&id).ok_or_else(|| not_found("lead", id))?;
        if lead.is_converted() {
            return Err(RepositoryError::state_rejection_with_context(
                "lead already converted",
                ErrorContext::new("convert_lead")
                    .with_entity("lead")
                    .with_entity_id(id),
            ));
        }
        lead.converted_customer_id = Some(customer.id);
        inner.customers.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }
}

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn get_offering(&self, id: ServiceOfferingId) -> RepositoryResult<ServiceOffering> {
        self.inner
            .read()
            .offerings
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("service_offering", id))
    }

    async fn insert_offering(&self, offering: &ServiceOffering) -> RepositoryResult<()> {
        self.inner
            .write()
            .offerings
            .insert(offering.id, offering.clone());
        Ok(())
    }

    async fn list_active_offerings(&self) -> RepositoryResult<Vec<ServiceOffering>> {
        Ok(self
            .inner
            .read()
            .offerings
            .values()
            .filter(|o| o.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StaffRepository for LocalRepository {
    async fn get_staff(&self, id: StaffId) -> RepositoryResult<Staff> {
        self.inner
            .read()
            .staff
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("staff", id))
    }

    async fn insert_staff(&self, staff: &Staff) -> RepositoryResult<()> {
        self.inner.write().staff.insert(staff.id, staff.clone());
        Ok(())
    }

    async fn list_active_techs(&self) -> RepositoryResult<Vec<Staff>> {
        let mut techs: Vec<Staff> = self
            .inner
            .read()
            .staff
            .values()
            .filter(|s| s.is_active && s.role.is_routable())
            .cloned()
            .collect();
        techs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(techs)
    }

    async fn get_availability(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<StaffAvailability>> {
        Ok(self.inner.read().availability.get(&(staff_id, date)).cloned())
    }

    async fn upsert_availability(&self, availability: &StaffAvailability) -> RepositoryResult<()> {
        availability.validate().map_err(RepositoryError::validation)?;
        self.inner
            .write()
            .availability
            .insert((availability.staff_id, availability.date), availability.clone());
        Ok(())
    }

    async fn list_available_staff(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<(Staff, StaffAvailability)>> {
        let inner = self.inner.read();
        let mut result: Vec<(Staff, StaffAvailability)> = inner
            .availability
            .values()
            .filter(|av| av.date == date && av.is_available)
            .filter_map(|av| {
                inner
                    .staff
                    .get(&av.staff_id)
                    .filter(|s| s.is_active && s.role.is_routable())
                    .map(|s| (s.clone(), av.clone()))
            })
            .collect();
        result.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(result)
    }
}

#[async_trait]
impl JobRepository for LocalRepository {
    async fn get_job(&self, id: JobId) -> RepositoryResult<Job> {
        self.inner
            .read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("job", id))
    }

    async fn insert_job(&self, job: &Job) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        inner.jobs.insert(job.id, job.clone());
        inner
            .status_history
            .push(JobStatusHistory::record(job.id, None, job.status, None, None));
        Ok(())
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> RepositoryResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .inner
            .read()
            .jobs
            .values()
            .filter(|j| j.status == status)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        Ok(jobs)
    }

    async fn transition_job(&self, transition: &JobTransition) -> RepositoryResult<Job> {
        let mut inner = self.inner.write();
        stage_transition(&mut inner, transition)?;
        Ok(inner.jobs[&transition.job_id].clone())
    }

    async fn set_job_priority(
        &self,
        id: JobId,
        priority: crate::models::JobPriority,
    ) -> RepositoryResult<()> {
        let mut inner = self.inner.write();
        let job = inner.jobs.get_mut(&id).ok_or_else(|| not_found("job", id))?;
        job.priority = priority;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn fetch_status_history(&self, id: JobId) -> RepositoryResult<Vec<JobStatusHistory>> {
        let mut entries: Vec<JobStatusHistory> = self
            .inner
            .read()
            .status_history
            .iter()
            .filter(|h| h.job_id == id)
            .cloned()
            .collect();
        entries.sort_by_key(|h| h.changed_at);
        Ok(entries)
    }
}

#[async_trait]
impl ScheduleRepository for LocalRepository {
    async fn get_appointment(&self, id: AppointmentId) -> RepositoryResult<Appointment> {
        self.inner
            .read()
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("appointment", id))
    }

    async fn list_appointments_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .inner
            .read()
            .appointments
            .values()
            .filter(|a| a.date == date)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.staff_id.value(), a.route_order));
        Ok(appointments)
    }

    async fn list_staff_appointments(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .inner
            .read()
            .appointments
            .values()
            .filter(|a| a.staff_id == staff_id && a.date == date)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.route_order);
        Ok(appointments)
    }

    async fn list_waitlist_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self
            .inner
            .read()
            .waitlist
            .values()
            .filter(|w| w.preferred_date == date)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(entries)
    }

    async fn apply_schedule_mutation(
        &self,
        date: NaiveDate,
        mutation: ScheduleMutation,
    ) -> RepositoryResult<()> {
        if mutation.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.write();
        // Stage on a clone; commit only a fully valid batch.
        let mut staged = inner.clone();
        stage_mutation(&mut staged, date, &mutation)?;
        *inner = staged;
        Ok(())
    }

    async fn clear_day(
        &self,
        date: NaiveDate,
        cleared_by: Option<StaffId>,
        notes: Option<String>,
    ) -> RepositoryResult<ScheduleClearAudit> {
        let mut inner = self.inner.write();
        let mut staged = inner.clone();

        let day: Vec<Appointment> = staged
            .appointments
            .values()
            .filter(|a| a.date == date)
            .cloned()
            .collect();

        let snapshot = ScheduleSnapshot::capture(date, &day);
        let blob = snapshot.to_json();
        let checksum = snapshot_checksum(&blob);

        let mut jobs_reset = Vec::new();
        for appt in &day {
            if let Some(job) = staged.jobs.get(&appt.job_id) {
                if job.status == JobStatus::Scheduled && !jobs_reset.contains(&job.id) {
                    stage_transition(
                        &mut staged,
                        &JobTransition {
                            job_id: appt.job_id,
                            next_status: JobStatus::Approved,
                            actor: cleared_by,
                            notes: Some("schedule cleared".to_string()),
                        },
                    )?;
                    jobs_reset.push(appt.job_id);
                }
            }
            staged.appointments.remove(&appt.id);
        }

        let audit = ScheduleClearAudit {
            id: crate::api::ClearAuditId::new(),
            schedule_date: date,
            appointments_data: blob,
            snapshot_checksum: checksum,
            jobs_reset,
            appointment_count: day.len() as i32,
            cleared_by,
            cleared_at: Utc::now(),
            notes,
        };
        staged.clear_audits.push(audit.clone());

        validate_day(&staged, date)?;
        *inner = staged;
        Ok(audit)
    }

    async fn get_clear_audit(
        &self,
        id: crate::api::ClearAuditId,
    ) -> RepositoryResult<ScheduleClearAudit> {
        self.inner
            .read()
            .clear_audits
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| not_found("schedule_clear_audit", id))
    }

    async fn list_recent_clears(
        &self,
        limit: usize,
    ) -> RepositoryResult<Vec<ScheduleClearAudit>> {
        let inner = self.inner.read();
        let mut audits = inner.clear_audits.clone();
        audits.sort_by(|a, b| b.cleared_at.cmp(&a.cleared_at));
        audits.truncate(limit);
        Ok(audits)
    }

    async fn list_reassignments(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleReassignment>> {
        Ok(self
            .inner
            .read()
            .reassignments
            .iter()
            .filter(|r| r.reassignment_date == date)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InvoiceRepository for LocalRepository {
    async fn get_invoice(&self, id: InvoiceId) -> RepositoryResult<Invoice> {
        self.inner
            .read()
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("invoice", id))
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> RepositoryResult<()> {
        invoice
            .check_invariants()
            .map_err(RepositoryError::validation)?;
        self.inner.write().invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> RepositoryResult<()> {
        invoice
            .check_invariants()
            .map_err(RepositoryError::validation)?;
        let mut inner = self.inner.write();
        if !inner.invoices.contains_key(&invoice.id) {
            return Err(not_found("invoice", invoice.id));
        }
        inner.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn record_payment(
        &self,
        id: InvoiceId,
        amount: Cents,
        method: PaymentMethod,
    ) -> RepositoryResult<Invoice> {
        if amount.value() <= 0 {
            return Err(RepositoryError::validation("payment amount must be positive"));
        }
        let mut inner = self.inner.write();
        let invoice = inner
            .invoices
            .get_mut(&id)
            .ok_or_else(|| not_found("invoice", id))?;

        if !invoice.status.is_open() {
            return Err(RepositoryError::state_rejection_with_context(
                format!("invoice in status {} accepts no payments", invoice.status),
                ErrorContext::new("record_payment")
                    .with_entity("invoice")
                    .with_entity_id(id),
            ));
        }
        let new_paid = invoice.paid_amount + amount;
        if new_paid > invoice.total() {
            return Err(RepositoryError::validation(format!(
                "payment would exceed total: {} > {}",
                new_paid,
                invoice.total()
            )));
        }

        invoice.paid_amount = new_paid;
        invoice.payment_method = Some(method);
        invoice.updated_at = Utc::now();
        if invoice.is_fully_paid() {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at = Some(Utc::now());
        } else {
            invoice.status = InvoiceStatus::PartiallyPaid;
        }
        Ok(invoice.clone())
    }

    async fn list_lien_warning_due(&self, today: NaiveDate) -> RepositoryResult<Vec<Invoice>> {
        Ok(self
            .inner
            .read()
            .invoices
            .values()
            .filter(|i| i.lien_warning_due(today))
            .cloned()
            .collect())
    }

    async fn last_invoice_sequence(&self, year: i32) -> RepositoryResult<u32> {
        let prefix = format!("INV-{}-", year);
        Ok(self
            .inner
            .read()
            .invoices
            .values()
            .filter_map(|i| i.invoice_number.strip_prefix(&prefix))
            .filter_map(|seq| seq.parse::<u32>().ok())
            .max()
            .unwrap_or(0))
    }
}

#[async_trait]
impl MessageRepository for LocalRepository {
    async fn insert_sent_message(&self, message: &SentMessage) -> RepositoryResult<()> {
        self.inner.write().sent_messages.push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl FullRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }
}
