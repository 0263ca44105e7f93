//! Shared schedule-invariant validation.
//!
//! Both backends run this over the staged state of a date before
//! committing a mutation batch: per-staff overlap, availability window and
//! lunch, equipment compatibility, and the scheduled-job appointment
//! count. Window and equipment checks bind future-facing appointments
//! (`scheduled`/`confirmed`); in-progress and completed rows are
//! historical facts.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::api::{JobId, StaffId};
use crate::models::{Appointment, AppointmentStatus, Job, JobStatus, Staff, StaffAvailability};

/// Staged state of one date, plus the global live-appointment counts for
/// every job referenced by the batch.
pub struct DayState {
    pub date: NaiveDate,
    /// Every appointment on the date (all statuses).
    pub appointments: Vec<Appointment>,
    /// Jobs referenced by the appointments and by the batch transitions.
    pub jobs: HashMap<JobId, Job>,
    pub staff: HashMap<StaffId, Staff>,
    pub availability: HashMap<StaffId, StaffAvailability>,
    /// Non-cancelled appointment counts per job across all dates.
    pub live_counts: HashMap<JobId, usize>,
}

pub fn validate_day_state(state: &DayState) -> Result<(), String> {
    let live: Vec<&Appointment> = state
        .appointments
        .iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .collect();

    for (i, a) in live.iter().enumerate() {
        for b in live.iter().skip(i + 1) {
            if a.overlaps(b) {
                return Err(format!(
                    "appointments {} and {} overlap on staff {}",
                    a.id, b.id, a.staff_id
                ));
            }
        }
    }

    for appt in &live {
        if !matches!(
            appt.status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        ) {
            continue;
        }

        match state.availability.get(&appt.staff_id) {
            Some(av) if av.is_available => {
                if appt.start_time < av.window_start || appt.end_time > av.window_end {
                    return Err(format!(
                        "appointment {} outside availability window",
                        appt.id
                    ));
                }
                if let Some(lunch_start) = av.lunch_start {
                    let lunch_end =
                        lunch_start + chrono::Duration::minutes(av.lunch_duration_minutes as i64);
                    if appt.start_time < lunch_end && appt.end_time > lunch_start {
                        return Err(format!("appointment {} crosses lunch interval", appt.id));
                    }
                }
            }
            _ => {
                return Err(format!(
                    "staff {} not available on {} for appointment {}",
                    appt.staff_id, state.date, appt.id
                ));
            }
        }

        if let (Some(job), Some(staff)) = (
            state.jobs.get(&appt.job_id),
            state.staff.get(&appt.staff_id),
        ) {
            if !staff.has_equipment(&job.equipment_required) {
                return Err(format!(
                    "staff {} lacks equipment for job {}",
                    staff.id, job.id
                ));
            }
        }
    }

    // Scheduled jobs carry exactly `staff_required` live appointments;
    // jobs out of the scheduled/in-progress/completed band carry none.
    for job in state.jobs.values() {
        let count = state.live_counts.get(&job.id).copied().unwrap_or(0);
        match job.status {
            JobStatus::Scheduled => {
                let required = usize::from(job.staff_required.max(1));
                if count != required {
                    return Err(format!(
                        "scheduled job {} has {} live appointments, wants {}",
                        job.id, count, required
                    ));
                }
            }
            JobStatus::InProgress | JobStatus::Completed => {}
            _ => {
                if count != 0 {
                    return Err(format!(
                        "job {} in status {} has live appointments",
                        job.id, job.status
                    ));
                }
            }
        }
    }

    Ok(())
}
