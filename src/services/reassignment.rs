//! Staff removal and job redistribution.
//!
//! Two-step flow: mark a staff unavailable for a date (cancelling their
//! appointments), then reassign the freed jobs onto another staff with
//! repeated single-job insertion in priority order. Leftovers land on the
//! waitlist.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{JobId, ReassignmentId, StaffId};
use crate::db::repository::{FullRepository, JobTransition, ScheduleMutation};
use crate::models::{AppointmentStatus, JobStatus, ScheduleReassignment, WaitlistEntry};
use crate::scheduler::insertion::best_insertion;
use crate::scheduler::travel::TravelTimeEstimator;
use crate::services::snapshot::{
    appointment_from_visit, load_day_snapshot, load_job_context, solver_job_for_insert,
};

use super::error::{ServiceError, ServiceResult};

/// Response from marking staff unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkUnavailableResponse {
    pub staff_id: StaffId,
    pub target_date: NaiveDate,
    pub affected_appointments: usize,
    pub message: String,
}

/// Response from staff reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignStaffResponse {
    pub reassignment_id: ReassignmentId,
    pub original_staff_id: StaffId,
    pub new_staff_id: StaffId,
    pub target_date: NaiveDate,
    pub jobs_reassigned: usize,
    pub jobs_waitlisted: usize,
    pub message: String,
}

/// A coverage option for reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageOption {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub available_capacity_minutes: u32,
    pub current_jobs: usize,
    pub can_cover_all: bool,
}

/// Response with coverage options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageOptionsResponse {
    pub target_date: NaiveDate,
    pub jobs_to_cover: usize,
    pub total_duration_minutes: u32,
    pub options: Vec<CoverageOption>,
}

pub struct ReassignmentService {
    repository: Arc<dyn FullRepository>,
    travel: Arc<dyn TravelTimeEstimator>,
}

impl ReassignmentService {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        travel: Arc<dyn TravelTimeEstimator>,
    ) -> Self {
        Self { repository, travel }
    }

    /// Flip availability off for (staff, date), cancel the staff's
    /// cancellable appointments, and return their jobs to the pool.
    pub async fn mark_unavailable(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
        reason: &str,
    ) -> ServiceResult<MarkUnavailableResponse> {
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation("reason must not be empty".to_string()));
        }
        // Surfaces not-found for unknown staff.
        let staff = self.repository.get_staff(staff_id).await?;

        let appointments: Vec<_> = self
            .repository
            .list_staff_appointments(staff_id, date)
            .await?
            .into_iter()
            .filter(|a| a.status.is_cancellable())
            .collect();

        let mut mutation = ScheduleMutation {
            mark_staff_unavailable: Some(staff_id),
            ..Default::default()
        };
        let day = self.repository.list_appointments_for_date(date).await?;
        for appointment in &appointments {
            mutation
                .cancel_appointments
                .push((appointment.id, reason.to_string()));
            let job = self.repository.get_job(appointment.job_id).await?;
            // A multi-tech job loses all its co-assignments together.
            if job.staff_required > 1 {
                for sibling in day.iter().filter(|a| {
                    a.job_id == job.id && a.staff_id != staff_id && a.status.is_cancellable()
                }) {
                    mutation
                        .cancel_appointments
                        .push((sibling.id, format!("co-assignment freed: {}", reason)));
                }
            }
            if job.status == JobStatus::Scheduled {
                mutation.job_transitions.push(JobTransition {
                    job_id: job.id,
                    next_status: JobStatus::Approved,
                    actor: None,
                    notes: Some(format!("staff unavailable: {}", reason)),
                });
            }
        }

        self.repository.apply_schedule_mutation(date, mutation).await?;

        Ok(MarkUnavailableResponse {
            staff_id,
            target_date: date,
            affected_appointments: appointments.len(),
            message: format!(
                "{} marked unavailable; {} appointment(s) cancelled",
                staff.name,
                appointments.len()
            ),
        })
    }

    /// Reinsert the jobs freed from `original` onto `new_staff`, highest
    /// priority first. Jobs that do not fit go to the waitlist.
    pub async fn reassign(
        &self,
        original: StaffId,
        new_staff: StaffId,
        date: NaiveDate,
        reason: &str,
    ) -> ServiceResult<ReassignStaffResponse> {
        if original == new_staff {
            return Err(ServiceError::Validation(
                "new staff must differ from the original".to_string(),
            ));
        }
        let target = self.repository.get_staff(new_staff).await?;

        let mut freed_jobs = self.freed_jobs(original, date).await?;
        freed_jobs.sort_by(|a, b| b.priority.cmp(&a.priority));

        // Snapshot with only the target staff's day pinned: insertion may
        // not disturb anyone else's plan.
        let mut snapshot = load_day_snapshot(&self.repository, date, vec![], |a| {
            a.staff_id == new_staff
        })
        .await?;
        let target_idx = snapshot
            .input
            .staff
            .iter()
            .position(|s| s.id == new_staff)
            .ok_or_else(|| {
                ServiceError::StateRejection(format!(
                    "{} is not available on {}",
                    target.name, date
                ))
            })?;
        // Insertion scans only consider the target staff; re-home the
        // pinned visits onto the reduced staff list first.
        let target_staff = snapshot.input.staff[target_idx].clone();
        snapshot.input.staff = vec![target_staff];
        for job in &mut snapshot.input.jobs {
            if job.fixed_staff == Some(target_idx) {
                job.fixed_staff = Some(0);
            }
        }
        let mut routes = snapshot.input.seeded_routes();

        let mut mutation = ScheduleMutation::default();
        let mut reassigned = Vec::new();
        let mut waitlisted = Vec::new();

        for job in freed_jobs {
            // Multi-tech jobs need a full regenerate; one target staff
            // cannot cover the co-assignment.
            if job.staff_required > 1 {
                mutation
                    .add_waitlist
                    .push(WaitlistEntry::new(job.id, date, job.priority));
                waitlisted.push(job.id);
                continue;
            }
            let ctx = load_job_context(&self.repository, job.clone()).await?;
            let solver_job = solver_job_for_insert(&ctx, &snapshot.input.staff);
            snapshot.input.jobs.push(solver_job);
            let job_idx = snapshot.input.jobs.len() - 1;

            match best_insertion(&snapshot.input, &routes, job_idx, self.travel.as_ref()) {
                Some(insertion) => {
                    routes[0].insert(insertion.position, job_idx);
                    let slots = crate::scheduler::constraints::compute_route_slots(
                        &snapshot.input.staff[0],
                        &snapshot.input.jobs,
                        &routes[0],
                        self.travel.as_ref(),
                    );
                    let (sequence_index, slot) = slots
                        .iter()
                        .enumerate()
                        .find(|(_, s)| s.job_idx == job_idx)
                        .expect("inserted job present in route");
                    let visit = crate::scheduler::domain::PlannedVisit {
                        job_id: job.id,
                        customer_name: ctx.customer_name.clone(),
                        service_name: ctx.service_name.clone(),
                        start: slot.start,
                        end: slot.end,
                        duration_minutes: job.estimated_duration_minutes,
                        travel_minutes: slot.travel_minutes,
                        sequence_index,
                    };
                    mutation
                        .insert_appointments
                        .push(appointment_from_visit(date, new_staff, &visit));
                    mutation.job_transitions.push(JobTransition {
                        job_id: job.id,
                        next_status: JobStatus::Scheduled,
                        actor: None,
                        notes: Some(format!("reassigned: {}", reason)),
                    });
                    // Freeze the placement so later insertions plan
                    // around it.
                    snapshot.input.jobs[job_idx].fixed_start = Some(slot.start);
                    snapshot.input.jobs[job_idx].fixed_staff = Some(0);
                    reassigned.push(job.id);
                }
                None => {
                    snapshot.input.jobs.pop();
                    mutation
                        .add_waitlist
                        .push(WaitlistEntry::new(job.id, date, job.priority));
                    waitlisted.push(job.id);
                }
            }
        }

        let record = ScheduleReassignment {
            id: ReassignmentId::new(),
            original_staff_id: original,
            new_staff_id: new_staff,
            reassignment_date: date,
            reason: reason.to_string(),
            jobs_reassigned: reassigned.len() as u32,
            notes: None,
            created_at: Utc::now(),
        };
        let record_id = record.id;
        mutation.record_reassignment = Some(record);

        self.repository.apply_schedule_mutation(date, mutation).await?;

        Ok(ReassignStaffResponse {
            reassignment_id: record_id,
            original_staff_id: original,
            new_staff_id: new_staff,
            target_date: date,
            jobs_reassigned: reassigned.len(),
            jobs_waitlisted: waitlisted.len(),
            message: format!(
                "{} job(s) moved to {}; {} waitlisted",
                reassigned.len(),
                target.name,
                waitlisted.len()
            ),
        })
    }

    /// For each available staff, the remaining capacity and whether they
    /// alone could absorb every freed job. Read-only.
    pub async fn coverage_options(
        &self,
        date: NaiveDate,
    ) -> ServiceResult<CoverageOptionsResponse> {
        let freed = self.all_freed_jobs(date).await?;
        let total_duration_minutes: u32 =
            freed.iter().map(|j| j.total_minutes()).sum();

        let mut options = Vec::new();
        for (staff, availability) in self.repository.list_available_staff(date).await? {
            let appointments = self
                .repository
                .list_staff_appointments(staff.id, date)
                .await?;
            let busy: u32 = appointments
                .iter()
                .filter(|a| a.status != AppointmentStatus::Cancelled)
                .map(|a| a.duration_minutes() + a.travel_minutes)
                .sum();
            let current_jobs = appointments
                .iter()
                .filter(|a| a.status != AppointmentStatus::Cancelled)
                .count();
            let capacity = availability.working_minutes().saturating_sub(busy);
            let equipped = freed
                .iter()
                .all(|job| staff.has_equipment(&job.equipment_required));
            options.push(CoverageOption {
                staff_id: staff.id,
                staff_name: staff.name.clone(),
                available_capacity_minutes: capacity,
                current_jobs,
                can_cover_all: equipped && capacity >= total_duration_minutes,
            });
        }
        options.sort_by(|a, b| b.available_capacity_minutes.cmp(&a.available_capacity_minutes));

        Ok(CoverageOptionsResponse {
            target_date: date,
            jobs_to_cover: freed.len(),
            total_duration_minutes,
            options,
        })
    }

    /// Jobs freed from one staff's cancelled appointments on `date`,
    /// still waiting in the approved pool.
    async fn freed_jobs(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> ServiceResult<Vec<crate::models::Job>> {
        let mut jobs = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for appointment in self.repository.list_staff_appointments(staff_id, date).await? {
            if appointment.status != AppointmentStatus::Cancelled {
                continue;
            }
            if !seen.insert(appointment.job_id) {
                continue;
            }
            let job = self.repository.get_job(appointment.job_id).await?;
            if job.status == JobStatus::Approved {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn all_freed_jobs(&self, date: NaiveDate) -> ServiceResult<Vec<crate::models::Job>> {
        let mut jobs = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for appointment in self.repository.list_appointments_for_date(date).await? {
            if appointment.status != AppointmentStatus::Cancelled {
                continue;
            }
            if !seen.insert(appointment.job_id) {
                continue;
            }
            let job = self.repository.get_job(appointment.job_id).await?;
            if job.status == JobStatus::Approved {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Freed-job ids for a staff on a date, used by tests.
    pub async fn freed_job_ids(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> ServiceResult<Vec<JobId>> {
        Ok(self
            .freed_jobs(staff_id, date)
            .await?
            .into_iter()
            .map(|j| j.id)
            .collect())
    }
}
