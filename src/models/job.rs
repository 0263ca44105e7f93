//! Job records and the append-only status history.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{Cents, CustomerId, JobId, PropertyId, ServiceOfferingId, StaffId};

use super::enums::{JobCategory, JobStatus};

/// Job priority, 0 (normal) through 3 (emergency).
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobPriority(u8);

impl JobPriority {
    pub const NORMAL: JobPriority = JobPriority(0);
    pub const ELEVATED: JobPriority = JobPriority(1);
    pub const URGENT: JobPriority = JobPriority(2);
    pub const EMERGENCY: JobPriority = JobPriority(3);

    /// Construct, clamping into the valid 0..=3 range.
    pub fn new(level: u8) -> Self {
        JobPriority(level.min(3))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Priority >= 2 makes the preferred time window a hard constraint.
    pub fn is_urgent(self) -> bool {
        self.0 >= 2
    }
}

/// Unit of work against a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub customer_id: CustomerId,
    pub property_id: PropertyId,
    pub service_offering_id: ServiceOfferingId,
    pub category: JobCategory,
    pub status: JobStatus,
    pub priority: JobPriority,
    /// Derived from the offering and the property's zone count at approval.
    pub estimated_duration_minutes: u32,
    pub equipment_required: Vec<String>,
    pub staff_required: u8,
    pub buffer_minutes: u32,
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    /// Price captured when the job was approved; later catalog edits do not
    /// change it.
    pub price_snapshot: Option<Cents>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Service time plus buffer.
    pub fn total_minutes(&self) -> u32 {
        self.estimated_duration_minutes + self.buffer_minutes
    }

    pub fn is_schedulable(&self) -> bool {
        self.status == JobStatus::Approved
    }
}

/// One immutable entry in a job's status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusHistory {
    pub id: Uuid,
    pub job_id: JobId,
    /// `None` for the initial entry.
    pub previous_status: Option<JobStatus>,
    pub new_status: JobStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<StaffId>,
    pub notes: Option<String>,
}

impl JobStatusHistory {
    pub fn record(
        job_id: JobId,
        previous: Option<JobStatus>,
        next: JobStatus,
        actor: Option<StaffId>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            previous_status: previous,
            new_status: next,
            changed_at: Utc::now(),
            changed_by: actor,
            notes,
        }
    }
}

/// Replay a job's history in timestamp order and return the final status.
///
/// Returns `None` for an empty history. Used by tests to check that the
/// chain is consistent with the job's current status.
pub fn replay_status_history(entries: &[JobStatusHistory]) -> Option<JobStatus> {
    let mut sorted: Vec<&JobStatusHistory> = entries.iter().collect();
    sorted.sort_by_key(|e| e.changed_at);
    sorted.last().map(|e| e.new_status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_clamps() {
        assert_eq!(JobPriority::new(7), JobPriority::EMERGENCY);
        assert_eq!(JobPriority::new(0), JobPriority::NORMAL);
        assert!(JobPriority::URGENT.is_urgent());
        assert!(!JobPriority::ELEVATED.is_urgent());
    }

    #[test]
    fn replay_follows_timestamps() {
        let job_id = JobId::new();
        let base = Utc::now();
        let mut entries = vec![
            JobStatusHistory::record(job_id, None, JobStatus::Requested, None, None),
            JobStatusHistory::record(
                job_id,
                Some(JobStatus::Requested),
                JobStatus::Approved,
                None,
                None,
            ),
            JobStatusHistory::record(
                job_id,
                Some(JobStatus::Approved),
                JobStatus::Scheduled,
                None,
                None,
            ),
        ];
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.changed_at = base + chrono::Duration::seconds(i as i64);
        }
        // Shuffle: replay must sort by timestamp, not input order.
        entries.swap(0, 2);
        assert_eq!(replay_status_history(&entries), Some(JobStatus::Scheduled));
    }

    #[test]
    fn replay_empty_history() {
        assert_eq!(replay_status_history(&[]), None);
    }
}
