//! Day-snapshot construction: turning repository rows into solver input.

use chrono::{NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::api::{AppointmentId, GeoPoint, JobId, StaffId};
use crate::db::repository::FullRepository;
use crate::models::{Appointment, AppointmentStatus, Job, Staff, StaffAvailability};
use crate::scheduler::domain::{
    minutes_to_time, time_to_minutes, PlannedVisit, SolverInput, SolverJob, SolverStaff,
};

use super::error::ServiceResult;

/// A job joined with the rows the solver needs.
pub struct JobContext {
    pub job: Job,
    pub customer_name: String,
    pub service_name: String,
    pub city: Option<String>,
    pub location: Option<GeoPoint>,
}

pub async fn load_job_context(
    repo: &Arc<dyn FullRepository>,
    job: Job,
) -> ServiceResult<JobContext> {
    let property = repo.get_property(job.property_id).await?;
    let offering = repo.get_offering(job.service_offering_id).await?;
    let customer = repo.get_customer(job.customer_id).await?;
    Ok(JobContext {
        customer_name: customer.full_name(),
        service_name: offering.name,
        city: Some(property.city),
        location: property.location,
        job,
    })
}

/// Fallback site for jobs whose property has no coordinates: the first
/// staff's start location, so travel terms stay defined.
fn fallback_location(staff: &[SolverStaff]) -> GeoPoint {
    staff
        .first()
        .map(|s| s.start_location)
        .unwrap_or(GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        })
}

pub fn solver_staff(staff: &Staff, availability: &StaffAvailability) -> SolverStaff {
    SolverStaff {
        id: staff.id,
        name: staff.name.clone(),
        start_location: staff.start_location.unwrap_or(GeoPoint {
            latitude: 0.0,
            longitude: 0.0,
        }),
        equipment: staff.assigned_equipment.clone(),
        window_start: time_to_minutes(availability.window_start),
        window_end: time_to_minutes(availability.window_end),
        lunch_start: availability.lunch_start.map(time_to_minutes),
        lunch_minutes: availability.lunch_duration_minutes,
    }
}

fn free_solver_job(ctx: &JobContext, staff: &[SolverStaff]) -> SolverJob {
    let location = ctx.location.unwrap_or_else(|| {
        log::warn!(
            "property for job {} has no coordinates; using depot fallback",
            ctx.job.id
        );
        fallback_location(staff)
    });
    SolverJob {
        id: ctx.job.id,
        customer_name: ctx.customer_name.clone(),
        service_name: ctx.service_name.clone(),
        category: ctx.job.category,
        location,
        city: ctx.city.clone(),
        duration_minutes: ctx.job.estimated_duration_minutes,
        buffer_minutes: ctx.job.buffer_minutes,
        equipment_required: ctx.job.equipment_required.clone(),
        priority: ctx.job.priority,
        preferred_start: ctx.job.preferred_time_start.map(time_to_minutes),
        preferred_end: ctx.job.preferred_time_end.map(time_to_minutes),
        staff_required: ctx.job.staff_required,
        fixed_start: None,
        fixed_staff: None,
        displaceable: true,
    }
}

fn pinned_solver_job(
    ctx: &JobContext,
    appointment: &Appointment,
    staff_idx: usize,
    staff: &[SolverStaff],
) -> SolverJob {
    let mut job = free_solver_job(ctx, staff);
    // Pinned visits keep their persisted window, not the derived estimate.
    job.duration_minutes = appointment.duration_minutes();
    job.fixed_start = Some(time_to_minutes(appointment.start_time));
    job.fixed_staff = Some(staff_idx);
    job.displaceable = appointment.status == AppointmentStatus::Scheduled;
    // Each persisted co-assignment row is its own pinned visit; the
    // synchronization already happened when the rows were written.
    job.staff_required = 1;
    // The committed slot is authoritative; re-judging it against the
    // preferred window would wedge days containing manual placements.
    job.preferred_start = None;
    job.preferred_end = None;
    job
}

/// Build the solver job for a single-job insertion (emergency dispatch,
/// staff reassignment).
pub fn solver_job_for_insert(ctx: &JobContext, staff: &[SolverStaff]) -> SolverJob {
    free_solver_job(ctx, staff)
}

/// The loaded day: solver input plus the bookkeeping the services need to
/// persist a solution afterwards.
pub struct DaySnapshot {
    pub input: SolverInput,
    /// Ids of jobs represented as pinned visits (already persisted).
    pub pinned_jobs: HashSet<JobId>,
    /// Live appointments by job, for displacement bookkeeping.
    pub appointments_by_job: HashMap<JobId, Vec<Appointment>>,
}

/// Load staff, their availability, existing appointments, and a pool of
/// free jobs for `date`.
///
/// `pin` selects which existing appointments become pinned visits; the
/// rest are ignored (their jobs may appear in `free_jobs` instead).
pub async fn load_day_snapshot(
    repo: &Arc<dyn FullRepository>,
    date: NaiveDate,
    free_jobs: Vec<Job>,
    pin: impl Fn(&Appointment) -> bool,
) -> ServiceResult<DaySnapshot> {
    let roster = repo.list_available_staff(date).await?;
    let staff: Vec<SolverStaff> = roster
        .iter()
        .map(|(s, a)| solver_staff(s, a))
        .collect();
    let staff_index: HashMap<StaffId, usize> = roster
        .iter()
        .enumerate()
        .map(|(i, (s, _))| (s.id, i))
        .collect();

    let mut jobs = Vec::new();
    let mut pinned_jobs = HashSet::new();
    let mut appointments_by_job: HashMap<JobId, Vec<Appointment>> = HashMap::new();

    for appointment in repo.list_appointments_for_date(date).await? {
        if appointment.status == AppointmentStatus::Cancelled {
            continue;
        }
        appointments_by_job
            .entry(appointment.job_id)
            .or_default()
            .push(appointment.clone());

        if !pin(&appointment) {
            continue;
        }
        // Co-assignments: one pinned visit per appointment row.
        let Some(&staff_idx) = staff_index.get(&appointment.staff_id) else {
            continue;
        };
        let job = repo.get_job(appointment.job_id).await?;
        let ctx = load_job_context(repo, job).await?;
        jobs.push(pinned_solver_job(&ctx, &appointment, staff_idx, &staff));
        pinned_jobs.insert(appointment.job_id);
    }

    for job in free_jobs {
        if pinned_jobs.contains(&job.id) {
            continue;
        }
        let ctx = load_job_context(repo, job).await?;
        jobs.push(free_solver_job(&ctx, &staff));
    }

    Ok(DaySnapshot {
        input: SolverInput { date, jobs, staff },
        pinned_jobs,
        appointments_by_job,
    })
}

/// Materialize an appointment row from a planned visit.
pub fn appointment_from_visit(
    date: NaiveDate,
    staff_id: StaffId,
    visit: &PlannedVisit,
) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: AppointmentId::new(),
        job_id: visit.job_id,
        staff_id,
        date,
        start_time: minutes_to_time(visit.start),
        end_time: minutes_to_time(visit.end),
        status: AppointmentStatus::Scheduled,
        route_order: visit.sequence_index as i32,
        travel_minutes: visit.travel_minutes,
        arrived_at: None,
        completed_at: None,
        cancelled_at: None,
        cancellation_reason: None,
        rescheduled_from: None,
        created_at: now,
        updated_at: now,
    }
}
