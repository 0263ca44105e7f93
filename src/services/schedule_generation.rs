//! Schedule generation: turn the approved-job pool into a day plan.
//!
//! `generate` plans around every existing live appointment; `reoptimize`
//! re-solves the day but only moves appointments still in `scheduled` —
//! confirmed or started work is pinned.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::api::{JobId, StaffId};
use crate::db::repository::{FullRepository, JobTransition, ScheduleMutation};
use crate::models::{AppointmentStatus, JobStatus};
use crate::scheduler::domain::{minutes_to_time, ScheduleSolution};
use crate::scheduler::solver::{solve, SolverParams};
use crate::scheduler::travel::TravelTimeEstimator;

use super::error::{ServiceError, ServiceResult};
use super::snapshot::{appointment_from_visit, load_day_snapshot, DaySnapshot};

/// A job assignment in the generated schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleJobAssignment {
    pub job_id: JobId,
    pub customer_name: String,
    pub service_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: u32,
    pub travel_time_minutes: u32,
    pub sequence_index: usize,
}

/// Staff assignment with their jobs for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStaffAssignment {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub jobs: Vec<ScheduleJobAssignment>,
    pub total_jobs: usize,
    pub total_travel_minutes: u32,
    pub first_job_start: Option<NaiveTime>,
    pub last_job_end: Option<NaiveTime>,
}

/// A job that could not be assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignedJobDto {
    pub job_id: JobId,
    pub customer_name: String,
    pub service_type: String,
    pub reason: String,
}

/// Response from schedule generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGenerateResponse {
    pub schedule_date: NaiveDate,
    pub is_feasible: bool,
    pub hard_score: i64,
    pub soft_score: i64,
    pub assignments: Vec<ScheduleStaffAssignment>,
    pub unassigned_jobs: Vec<UnassignedJobDto>,
    pub total_jobs: usize,
    pub total_assigned: usize,
    pub total_travel_minutes: u32,
    pub optimization_time_seconds: f64,
}

/// Response for the capacity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCapacityResponse {
    pub schedule_date: NaiveDate,
    pub total_staff: usize,
    pub available_staff: usize,
    pub total_capacity_minutes: u32,
    pub scheduled_minutes: u32,
    pub remaining_capacity_minutes: u32,
    pub can_accept_more: bool,
}

pub struct ScheduleGenerationService {
    repository: Arc<dyn FullRepository>,
    travel: Arc<dyn TravelTimeEstimator>,
    /// Fixed seed for deterministic runs; tests set this.
    seed: Option<u64>,
}

impl ScheduleGenerationService {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        travel: Arc<dyn TravelTimeEstimator>,
    ) -> Self {
        Self {
            repository,
            travel,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Generate a plan for `date` from the approved-job pool, scheduling
    /// around every existing live appointment. Persists only feasible
    /// solutions; an infeasible best attempt is returned without writes.
    pub async fn generate(
        &self,
        date: NaiveDate,
        timeout_seconds: u64,
        terminate: Option<Arc<AtomicBool>>,
    ) -> ServiceResult<ScheduleGenerateResponse> {
        let free_jobs = self.repository.list_jobs_by_status(JobStatus::Approved).await?;
        let snapshot =
            load_day_snapshot(&self.repository, date, free_jobs, |_| true).await?;

        let solution = self
            .run_solver(&snapshot, timeout_seconds, terminate)
            .await?;

        if solution.is_feasible() {
            self.persist(&snapshot, &solution, date).await?;
        }

        Ok(build_response(&solution))
    }

    /// Re-solve the day. Appointments `confirmed` or later keep their
    /// slots; only `scheduled` ones may move.
    pub async fn reoptimize(
        &self,
        date: NaiveDate,
        timeout_seconds: u64,
        terminate: Option<Arc<AtomicBool>>,
    ) -> ServiceResult<ScheduleGenerateResponse> {
        let mut free_jobs = self.repository.list_jobs_by_status(JobStatus::Approved).await?;

        // Free every movable appointment's job back into the pool.
        let mut movable_appointments = Vec::new();
        let mut movable_job_ids = HashSet::new();
        for appointment in self.repository.list_appointments_for_date(date).await? {
            if appointment.status == AppointmentStatus::Scheduled {
                movable_job_ids.insert(appointment.job_id);
                movable_appointments.push(appointment);
            }
        }
        for &job_id in &movable_job_ids {
            free_jobs.push(self.repository.get_job(job_id).await?);
        }

        let snapshot = load_day_snapshot(&self.repository, date, free_jobs, |appointment| {
            appointment.status != AppointmentStatus::Scheduled
        })
        .await?;

        let solution = self
            .run_solver(&snapshot, timeout_seconds, terminate)
            .await?;

        if solution.is_feasible() {
            let mut mutation = self.build_mutation(&snapshot, &solution, date);
            mutation.delete_appointments =
                movable_appointments.iter().map(|a| a.id).collect();

            // A previously scheduled job left out of the new plan returns
            // to the pool.
            let assigned: HashSet<JobId> = solution
                .routes
                .iter()
                .flat_map(|r| r.visits.iter().map(|v| v.job_id))
                .collect();
            for &job_id in movable_job_ids.iter().filter(|id| !assigned.contains(*id)) {
                mutation.job_transitions.push(JobTransition {
                    job_id,
                    next_status: JobStatus::Approved,
                    actor: None,
                    notes: Some("dropped during re-optimization".to_string()),
                });
            }
            // Re-assigned jobs are already `scheduled`; only newly placed
            // pool jobs need a transition.
            mutation.job_transitions.retain(|t| {
                t.next_status != JobStatus::Scheduled || !movable_job_ids.contains(&t.job_id)
            });

            self.repository.apply_schedule_mutation(date, mutation).await?;
        }

        Ok(build_response(&solution))
    }

    /// Per-date capacity summary. Read-only.
    pub async fn capacity(&self, date: NaiveDate) -> ServiceResult<ScheduleCapacityResponse> {
        let total_staff = self.repository.list_active_techs().await?.len();
        let roster = self.repository.list_available_staff(date).await?;
        let total_capacity_minutes: u32 =
            roster.iter().map(|(_, a)| a.working_minutes()).sum();

        let scheduled_minutes: u32 = self
            .repository
            .list_appointments_for_date(date)
            .await?
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
            .map(|a| a.duration_minutes() + a.travel_minutes)
            .sum();

        let remaining = total_capacity_minutes.saturating_sub(scheduled_minutes);
        Ok(ScheduleCapacityResponse {
            schedule_date: date,
            total_staff,
            available_staff: roster.len(),
            total_capacity_minutes,
            scheduled_minutes,
            remaining_capacity_minutes: remaining,
            can_accept_more: remaining > 0,
        })
    }

    async fn run_solver(
        &self,
        snapshot: &DaySnapshot,
        timeout_seconds: u64,
        terminate: Option<Arc<AtomicBool>>,
    ) -> ServiceResult<ScheduleSolution> {
        let mut params = SolverParams::with_timeout_seconds(timeout_seconds);
        if let Some(seed) = self.seed {
            params = params.seeded(seed);
        }
        let input = snapshot.input.clone();
        let travel = Arc::clone(&self.travel);

        tokio::task::spawn_blocking(move || solve(&input, travel.as_ref(), &params, terminate))
            .await
            .map_err(|e| ServiceError::Internal(format!("solver task failed: {}", e)))
    }

    fn build_mutation(
        &self,
        snapshot: &DaySnapshot,
        solution: &ScheduleSolution,
        date: NaiveDate,
    ) -> ScheduleMutation {
        let mut mutation = ScheduleMutation::default();
        let mut transitioned = HashSet::new();

        for route in &solution.routes {
            for visit in &route.visits {
                if snapshot.pinned_jobs.contains(&visit.job_id) {
                    continue;
                }
                mutation
                    .insert_appointments
                    .push(appointment_from_visit(date, route.staff_id, visit));
                if transitioned.insert(visit.job_id) {
                    mutation.job_transitions.push(JobTransition {
                        job_id: visit.job_id,
                        next_status: JobStatus::Scheduled,
                        actor: None,
                        notes: Some("placed by route optimizer".to_string()),
                    });
                }
            }
        }
        mutation
    }

    async fn persist(
        &self,
        snapshot: &DaySnapshot,
        solution: &ScheduleSolution,
        date: NaiveDate,
    ) -> ServiceResult<()> {
        let mutation = self.build_mutation(snapshot, solution, date);
        self.repository
            .apply_schedule_mutation(date, mutation)
            .await?;
        Ok(())
    }
}

/// Shape a solver solution into the API response.
pub(crate) fn build_response(solution: &ScheduleSolution) -> ScheduleGenerateResponse {
    let assignments: Vec<ScheduleStaffAssignment> = solution
        .routes
        .iter()
        .map(|route| {
            let jobs: Vec<ScheduleJobAssignment> = route
                .visits
                .iter()
                .map(|visit| ScheduleJobAssignment {
                    job_id: visit.job_id,
                    customer_name: visit.customer_name.clone(),
                    service_type: visit.service_name.clone(),
                    start_time: minutes_to_time(visit.start),
                    end_time: minutes_to_time(visit.end),
                    duration_minutes: visit.duration_minutes,
                    travel_time_minutes: visit.travel_minutes,
                    sequence_index: visit.sequence_index,
                })
                .collect();
            ScheduleStaffAssignment {
                staff_id: route.staff_id,
                staff_name: route.staff_name.clone(),
                total_jobs: jobs.len(),
                total_travel_minutes: route.total_travel_minutes,
                first_job_start: jobs.first().map(|j| j.start_time),
                last_job_end: jobs.last().map(|j| j.end_time),
                jobs,
            }
        })
        .collect();

    let unassigned_jobs: Vec<UnassignedJobDto> = solution
        .unassigned
        .iter()
        .map(|u| UnassignedJobDto {
            job_id: u.job_id,
            customer_name: u.customer_name.clone(),
            service_type: u.service_name.clone(),
            reason: u.reason.as_str().to_string(),
        })
        .collect();

    let total_assigned = solution.assigned_count();
    ScheduleGenerateResponse {
        schedule_date: solution.schedule_date,
        is_feasible: solution.is_feasible(),
        hard_score: solution.hard_score,
        soft_score: solution.soft_score,
        total_jobs: total_assigned + unassigned_jobs.len(),
        total_assigned,
        total_travel_minutes: solution.total_travel_minutes(),
        optimization_time_seconds: solution.elapsed_seconds,
        assignments,
        unassigned_jobs,
    }
}
