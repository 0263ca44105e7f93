//! Appointment cancellation, rescheduling, waitlist, and gap-filling.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{AppointmentId, JobId, StaffId, WaitlistEntryId};
use crate::db::repository::{FullRepository, JobTransition, ScheduleMutation};
use crate::models::{
    Appointment, AppointmentStatus, JobStatus, WaitlistEntry,
};
use crate::scheduler::domain::time_to_minutes;

use super::error::{ServiceError, ServiceResult};

/// Response from cancelling an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentResponse {
    pub appointment_id: AppointmentId,
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub waitlist_entry_id: Option<WaitlistEntryId>,
    pub message: String,
}

/// Response from rescheduling an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentResponse {
    pub original_appointment_id: AppointmentId,
    pub new_appointment_id: AppointmentId,
    pub new_date: NaiveDate,
    pub new_time_start: NaiveTime,
    pub new_time_end: NaiveTime,
    pub staff_id: StaffId,
    pub message: String,
}

/// Waitlist entry response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntryDto {
    pub id: WaitlistEntryId,
    pub job_id: JobId,
    pub preferred_date: NaiveDate,
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    pub priority: u8,
    pub notes: Option<String>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<WaitlistEntry> for WaitlistEntryDto {
    fn from(entry: WaitlistEntry) -> Self {
        Self {
            id: entry.id,
            job_id: entry.job_id,
            preferred_date: entry.preferred_date,
            preferred_time_start: entry.preferred_time_start,
            preferred_time_end: entry.preferred_time_end,
            priority: entry.priority.value(),
            notes: entry.notes,
            notified_at: entry.notified_at,
            created_at: entry.created_at,
        }
    }
}

/// A suggestion for filling a schedule gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillGapSuggestion {
    pub job_id: JobId,
    pub customer_name: String,
    pub service_type: String,
    pub duration_minutes: u32,
    pub priority: u8,
    pub from_waitlist: bool,
}

/// Response with suggestions for filling a gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillGapResponse {
    pub target_date: NaiveDate,
    pub gap_start: NaiveTime,
    pub gap_end: NaiveTime,
    pub gap_duration_minutes: u32,
    pub suggestions: Vec<FillGapSuggestion>,
}

pub struct ConflictResolutionService {
    repository: Arc<dyn FullRepository>,
}

impl ConflictResolutionService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// Cancel an appointment. The underlying job returns to the approved
    /// pool; co-assignments of a multi-tech job are cancelled together.
    pub async fn cancel_appointment(
        &self,
        appointment_id: AppointmentId,
        reason: &str,
        add_to_waitlist: bool,
        preferred_reschedule_date: Option<NaiveDate>,
    ) -> ServiceResult<CancelAppointmentResponse> {
        if reason.trim().is_empty() {
            return Err(ServiceError::Validation("reason must not be empty".to_string()));
        }
        let appointment = self.repository.get_appointment(appointment_id).await?;
        if !appointment.status.is_cancellable() {
            return Err(ServiceError::StateRejection(format!(
                "appointment in status {} cannot be cancelled",
                appointment.status
            )));
        }

        let job = self.repository.get_job(appointment.job_id).await?;
        let siblings = self.sibling_appointments(&appointment).await?;

        let mut mutation = ScheduleMutation::default();
        for sibling in &siblings {
            mutation
                .cancel_appointments
                .push((sibling.id, reason.to_string()));
        }
        if job.status == JobStatus::Scheduled {
            mutation.job_transitions.push(JobTransition {
                job_id: job.id,
                next_status: JobStatus::Approved,
                actor: None,
                notes: Some(format!("appointment cancelled: {}", reason)),
            });
        }

        let mut waitlist_entry_id = None;
        if add_to_waitlist {
            let mut entry = WaitlistEntry::new(
                job.id,
                preferred_reschedule_date.unwrap_or(appointment.date),
                job.priority,
            );
            entry.preferred_time_start = job.preferred_time_start;
            entry.preferred_time_end = job.preferred_time_end;
            waitlist_entry_id = Some(entry.id);
            mutation.add_waitlist.push(entry);
        }

        self.repository
            .apply_schedule_mutation(appointment.date, mutation)
            .await?;

        Ok(CancelAppointmentResponse {
            appointment_id,
            cancelled_at: Utc::now(),
            reason: reason.to_string(),
            waitlist_entry_id,
            message: if add_to_waitlist {
                "Appointment cancelled; job added to waitlist".to_string()
            } else {
                "Appointment cancelled".to_string()
            },
        })
    }

    /// Cancel the original appointment and create its replacement. The
    /// replacement's `rescheduled_from` points at the original, keeping
    /// the chain linear.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: AppointmentId,
        new_date: NaiveDate,
        new_time_start: NaiveTime,
        new_time_end: NaiveTime,
        new_staff_id: Option<StaffId>,
    ) -> ServiceResult<RescheduleAppointmentResponse> {
        if new_time_end <= new_time_start {
            return Err(ServiceError::Validation(
                "new end time must be after start time".to_string(),
            ));
        }
        let original = self.repository.get_appointment(appointment_id).await?;
        if !original.status.is_cancellable() {
            return Err(ServiceError::StateRejection(format!(
                "appointment in status {} cannot be rescheduled",
                original.status
            )));
        }

        let staff_id = new_staff_id.unwrap_or(original.staff_id);
        let now = Utc::now();
        let replacement = Appointment {
            id: AppointmentId::new(),
            job_id: original.job_id,
            staff_id,
            date: new_date,
            start_time: new_time_start,
            end_time: new_time_end,
            status: AppointmentStatus::Scheduled,
            route_order: 0,
            travel_minutes: 0,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            rescheduled_from: Some(original.id),
            created_at: now,
            updated_at: now,
        };
        let replacement_id = replacement.id;

        if new_date == original.date {
            // Same-day move: one atomic batch under the date lock.
            let mutation = ScheduleMutation {
                cancel_appointments: vec![(original.id, "rescheduled".to_string())],
                insert_appointments: vec![replacement],
                ..Default::default()
            };
            self.repository
                .apply_schedule_mutation(original.date, mutation)
                .await?;
        } else {
            // Cross-day move: two per-date batches. The job sits in
            // `approved` between them, so each step leaves a consistent
            // schedule even if the second fails.
            let job = self.repository.get_job(original.job_id).await?;
            let mut release = ScheduleMutation {
                cancel_appointments: vec![(original.id, "rescheduled".to_string())],
                ..Default::default()
            };
            if job.status == JobStatus::Scheduled {
                release.job_transitions.push(JobTransition {
                    job_id: job.id,
                    next_status: JobStatus::Approved,
                    actor: None,
                    notes: Some("rescheduling".to_string()),
                });
            }
            self.repository
                .apply_schedule_mutation(original.date, release)
                .await?;

            let place = ScheduleMutation {
                insert_appointments: vec![replacement],
                job_transitions: vec![JobTransition {
                    job_id: original.job_id,
                    next_status: JobStatus::Scheduled,
                    actor: None,
                    notes: Some("rescheduled".to_string()),
                }],
                ..Default::default()
            };
            self.repository
                .apply_schedule_mutation(new_date, place)
                .await?;
        }

        Ok(RescheduleAppointmentResponse {
            original_appointment_id: appointment_id,
            new_appointment_id: replacement_id,
            new_date,
            new_time_start,
            new_time_end,
            staff_id,
            message: "Appointment rescheduled".to_string(),
        })
    }

    /// Waitlist for a date, priority first. Read-only.
    pub async fn waitlist(&self, date: NaiveDate) -> ServiceResult<Vec<WaitlistEntryDto>> {
        Ok(self
            .repository
            .list_waitlist_for_date(date)
            .await?
            .into_iter()
            .map(WaitlistEntryDto::from)
            .collect())
    }

    /// Ranked candidates for an open interval: waitlist entries for the
    /// date plus approved jobs that fit the gap and the equipment on
    /// hand. Read-only.
    pub async fn fill_gap_suggestions(
        &self,
        date: NaiveDate,
        gap_start: NaiveTime,
        gap_end: NaiveTime,
        staff_id: Option<StaffId>,
    ) -> ServiceResult<FillGapResponse> {
        if gap_end <= gap_start {
            return Err(ServiceError::Validation("gap end must be after start".to_string()));
        }
        let gap_minutes =
            u32::from(time_to_minutes(gap_end) - time_to_minutes(gap_start));

        // Equipment on hand: the named staff, or anyone available.
        let equipment_pool: Vec<Vec<String>> = match staff_id {
            Some(id) => vec![self.repository.get_staff(id).await?.assigned_equipment],
            None => self
                .repository
                .list_available_staff(date)
                .await?
                .into_iter()
                .map(|(s, _)| s.assigned_equipment)
                .collect(),
        };
        let compatible = |required: &[String]| {
            equipment_pool.iter().any(|have| {
                required.iter().all(|eq| have.iter().any(|h| h == eq))
            })
        };

        let mut candidates: Vec<(FillGapSuggestion, u32)> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for entry in self.repository.list_waitlist_for_date(date).await? {
            let job = self.repository.get_job(entry.job_id).await?;
            if job.status != JobStatus::Approved || !seen.insert(job.id) {
                continue;
            }
            if job.total_minutes() > gap_minutes || !compatible(&job.equipment_required) {
                continue;
            }
            let slack = gap_minutes - job.total_minutes();
            let ctx =
                crate::services::snapshot::load_job_context(&self.repository, job).await?;
            candidates.push((
                FillGapSuggestion {
                    job_id: ctx.job.id,
                    customer_name: ctx.customer_name,
                    service_type: ctx.service_name,
                    duration_minutes: ctx.job.estimated_duration_minutes,
                    priority: ctx.job.priority.value(),
                    from_waitlist: true,
                },
                slack,
            ));
        }

        for job in self.repository.list_jobs_by_status(JobStatus::Approved).await? {
            if !seen.insert(job.id) {
                continue;
            }
            if job.total_minutes() > gap_minutes || !compatible(&job.equipment_required) {
                continue;
            }
            let slack = gap_minutes - job.total_minutes();
            let ctx =
                crate::services::snapshot::load_job_context(&self.repository, job).await?;
            candidates.push((
                FillGapSuggestion {
                    job_id: ctx.job.id,
                    customer_name: ctx.customer_name,
                    service_type: ctx.service_name,
                    duration_minutes: ctx.job.estimated_duration_minutes,
                    priority: ctx.job.priority.value(),
                    from_waitlist: false,
                },
                slack,
            ));
        }

        // Priority first, then the snuggest fit.
        candidates.sort_by(|(a, slack_a), (b, slack_b)| {
            b.priority.cmp(&a.priority).then(slack_a.cmp(slack_b))
        });

        Ok(FillGapResponse {
            target_date: date,
            gap_start,
            gap_end,
            gap_duration_minutes: gap_minutes,
            suggestions: candidates.into_iter().map(|(s, _)| s).collect(),
        })
    }

    /// Live appointments sharing the job (multi-tech co-assignments).
    async fn sibling_appointments(
        &self,
        appointment: &Appointment,
    ) -> ServiceResult<Vec<Appointment>> {
        Ok(self
            .repository
            .list_appointments_for_date(appointment.date)
            .await?
            .into_iter()
            .filter(|a| a.job_id == appointment.job_id && a.status.is_cancellable())
            .collect())
    }
}
