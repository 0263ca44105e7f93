//! Emergency job insertion into an already-populated day.
//!
//! Candidate scan first; if nothing fits, the minimum-weight set of
//! lower-priority scheduled jobs is bumped to the waitlist. The whole
//! change lands in one per-date mutation, so a failure leaves the
//! schedule untouched.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{JobId, StaffId};
use crate::db::repository::{FullRepository, JobTransition, ScheduleMutation};
use crate::models::{JobPriority, JobStatus, WaitlistEntry};
use crate::scheduler::constraints::compute_route_slots;
use crate::scheduler::domain::{minutes_to_time, PlannedVisit};
use crate::scheduler::insertion::{best_insertion, classify_unassigned, displacement_insertion};
use crate::scheduler::travel::TravelTimeEstimator;
use crate::services::snapshot::{appointment_from_visit, load_day_snapshot, load_job_context};

use super::error::{ServiceError, ServiceResult};

/// Response from emergency job insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyInsertResponse {
    pub success: bool,
    pub job_id: JobId,
    pub target_date: NaiveDate,
    pub assigned_staff_id: Option<StaffId>,
    pub assigned_staff_name: Option<String>,
    pub scheduled_time: Option<NaiveTime>,
    pub bumped_jobs: Vec<JobId>,
    pub constraint_violations: Vec<String>,
    pub message: String,
}

impl EmergencyInsertResponse {
    fn failure(job_id: JobId, target_date: NaiveDate, message: impl Into<String>) -> Self {
        Self {
            success: false,
            job_id,
            target_date,
            assigned_staff_id: None,
            assigned_staff_name: None,
            scheduled_time: None,
            bumped_jobs: vec![],
            constraint_violations: vec![],
            message: message.into(),
        }
    }
}

pub struct EmergencyService {
    repository: Arc<dyn FullRepository>,
    travel: Arc<dyn TravelTimeEstimator>,
}

impl EmergencyService {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        travel: Arc<dyn TravelTimeEstimator>,
    ) -> Self {
        Self { repository, travel }
    }

    /// Splice one high-priority job into `target_date`.
    pub async fn insert_emergency_job(
        &self,
        job_id: JobId,
        target_date: NaiveDate,
        priority_level: u8,
    ) -> ServiceResult<EmergencyInsertResponse> {
        let job = match self.repository.get_job(job_id).await {
            Ok(job) => job,
            Err(e) => {
                let err = ServiceError::from(e);
                // Unknown job is a negative outcome, not a fault.
                if matches!(err, ServiceError::NotFound(_)) {
                    return Ok(EmergencyInsertResponse::failure(
                        job_id,
                        target_date,
                        format!("Job {} not found", job_id),
                    ));
                }
                return Err(err);
            }
        };

        if job.status != JobStatus::Approved {
            return Ok(EmergencyInsertResponse::failure(
                job_id,
                target_date,
                format!("Job is in status {}, not approved", job.status),
            ));
        }
        if job.staff_required > 1 {
            let mut response = EmergencyInsertResponse::failure(
                job_id,
                target_date,
                "Multi-tech jobs cannot be emergency-inserted; regenerate the schedule",
            );
            response.constraint_violations.push("staff_count".to_string());
            return Ok(response);
        }

        let priority = JobPriority::new(priority_level);
        if priority != job.priority {
            self.repository.set_job_priority(job_id, priority).await?;
        }

        // Pin every live appointment; displaceability is carried per row.
        let mut snapshot =
            load_day_snapshot(&self.repository, target_date, vec![], |_| true).await?;

        let ctx = load_job_context(&self.repository, job).await?;
        let mut emergency = crate::services::snapshot::solver_job_for_insert(
            &ctx,
            &snapshot.input.staff,
        );
        emergency.priority = priority;
        snapshot.input.jobs.push(emergency);
        let job_idx = snapshot.input.jobs.len() - 1;

        let mut routes = snapshot.input.seeded_routes();
        let input = &snapshot.input;

        if let Some(insertion) = best_insertion(input, &routes, job_idx, self.travel.as_ref()) {
            routes[insertion.staff_idx].insert(insertion.position, job_idx);
            let visit = self.planned_visit(input, &routes, insertion.staff_idx, job_idx);
            let staff = &input.staff[insertion.staff_idx];

            let mut mutation = ScheduleMutation::default();
            mutation
                .insert_appointments
                .push(appointment_from_visit(target_date, staff.id, &visit));
            mutation.job_transitions.push(JobTransition {
                job_id,
                next_status: JobStatus::Scheduled,
                actor: None,
                notes: Some("emergency insertion".to_string()),
            });
            self.repository
                .apply_schedule_mutation(target_date, mutation)
                .await?;

            return Ok(EmergencyInsertResponse {
                success: true,
                job_id,
                target_date,
                assigned_staff_id: Some(staff.id),
                assigned_staff_name: Some(staff.name.clone()),
                scheduled_time: Some(minutes_to_time(visit.start)),
                bumped_jobs: vec![],
                constraint_violations: vec![],
                message: format!("Job scheduled with {}", staff.name),
            });
        }

        if let Some(displacement) =
            displacement_insertion(input, &routes, job_idx, self.travel.as_ref())
        {
            let bumped_job_ids: Vec<JobId> = displacement
                .bumped
                .iter()
                .map(|&i| input.jobs[i].id)
                .collect();

            routes[displacement.staff_idx]
                .retain(|i| !displacement.bumped.contains(i));
            routes[displacement.staff_idx].insert(displacement.position, job_idx);
            let visit = self.planned_visit(input, &routes, displacement.staff_idx, job_idx);
            let staff = &input.staff[displacement.staff_idx];

            let mut mutation = ScheduleMutation::default();
            for &bumped_id in &bumped_job_ids {
                for appointment in snapshot
                    .appointments_by_job
                    .get(&bumped_id)
                    .into_iter()
                    .flatten()
                {
                    mutation
                        .cancel_appointments
                        .push((appointment.id, "bumped for emergency job".to_string()));
                }
                let bumped_job = self.repository.get_job(bumped_id).await?;
                mutation.job_transitions.push(JobTransition {
                    job_id: bumped_id,
                    next_status: JobStatus::Approved,
                    actor: None,
                    notes: Some("bumped for emergency job".to_string()),
                });
                mutation
                    .add_waitlist
                    .push(WaitlistEntry::new(bumped_id, target_date, bumped_job.priority));
            }
            mutation
                .insert_appointments
                .push(appointment_from_visit(target_date, staff.id, &visit));
            mutation.job_transitions.push(JobTransition {
                job_id,
                next_status: JobStatus::Scheduled,
                actor: None,
                notes: Some("emergency insertion".to_string()),
            });
            self.repository
                .apply_schedule_mutation(target_date, mutation)
                .await?;

            return Ok(EmergencyInsertResponse {
                success: true,
                job_id,
                target_date,
                assigned_staff_id: Some(staff.id),
                assigned_staff_name: Some(staff.name.clone()),
                scheduled_time: Some(minutes_to_time(visit.start)),
                bumped_jobs: bumped_job_ids,
                constraint_violations: vec![],
                message: format!(
                    "Job scheduled with {}; {} lower-priority job(s) moved to waitlist",
                    staff.name,
                    displacement.bumped.len()
                ),
            });
        }

        let reason = classify_unassigned(input, job_idx);
        let mut response = EmergencyInsertResponse::failure(
            job_id,
            target_date,
            "No feasible placement found within constraints",
        );
        response.constraint_violations.push(reason.as_str().to_string());
        Ok(response)
    }

    /// Recompute the inserted job's slot from the updated route.
    fn planned_visit(
        &self,
        input: &crate::scheduler::domain::SolverInput,
        routes: &[Vec<usize>],
        staff_idx: usize,
        job_idx: usize,
    ) -> PlannedVisit {
        let staff = &input.staff[staff_idx];
        let slots = compute_route_slots(staff, &input.jobs, &routes[staff_idx], self.travel.as_ref());
        let (sequence_index, slot) = slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.job_idx == job_idx)
            .expect("inserted job present in its route");
        let job = &input.jobs[job_idx];
        PlannedVisit {
            job_id: job.id,
            customer_name: job.customer_name.clone(),
            service_name: job.service_name.clone(),
            start: slot.start,
            end: slot.end,
            duration_minutes: job.duration_minutes,
            travel_minutes: slot.travel_minutes,
            sequence_index,
        }
    }
}
