//! Appointment and waitlist records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AppointmentId, JobId, StaffId, WaitlistEntryId};

use super::enums::AppointmentStatus;
use super::job::JobPriority;

/// A concrete assignment of one job to one staff on one date.
///
/// Multi-tech jobs produce one appointment row per tech, all sharing the
/// job id and an identical time window. `rescheduled_from` forms a linear
/// chain: each appointment has at most one predecessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub job_id: JobId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    /// 0-based index within the staff's ordered day plan.
    pub route_order: i32,
    pub travel_minutes: u32,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_from: Option<AppointmentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> u32 {
        (self.end_time - self.start_time).num_minutes().max(0) as u32
    }

    /// Whether two appointments on the same staff overlap in time.
    ///
    /// Cancelled rows never overlap anything; co-assignments of the same
    /// job are exempt (they always sit on distinct staff).
    pub fn overlaps(&self, other: &Appointment) -> bool {
        if self.status == AppointmentStatus::Cancelled
            || other.status == AppointmentStatus::Cancelled
        {
            return false;
        }
        if self.staff_id != other.staff_id || self.date != other.date {
            return false;
        }
        if self.job_id == other.job_id {
            return false;
        }
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

/// A job awaiting a schedule slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub job_id: JobId,
    pub preferred_date: NaiveDate,
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    pub priority: JobPriority,
    pub notes: Option<String>,
    /// When the customer was told an opening exists.
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntry {
    pub fn new(job_id: JobId, preferred_date: NaiveDate, priority: JobPriority) -> Self {
        Self {
            id: WaitlistEntryId::new(),
            job_id,
            preferred_date,
            preferred_time_start: None,
            preferred_time_end: None,
            priority,
            notes: None,
            notified_at: None,
            created_at: Utc::now(),
        }
    }
}
