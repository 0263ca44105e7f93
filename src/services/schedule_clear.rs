//! Atomic schedule wipe with a snapshotted recovery record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{ClearAuditId, JobId, StaffId};
use crate::db::repository::FullRepository;
use crate::models::{ScheduleClearAudit, ScheduleSnapshot};

use super::error::{ServiceError, ServiceResult};

/// Response from clearing a day's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleClearResponse {
    pub audit_id: ClearAuditId,
    pub schedule_date: NaiveDate,
    pub appointments_cleared: i32,
    pub jobs_reset: Vec<JobId>,
    pub message: String,
}

/// One audit row in the recent-clears listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearAuditDto {
    pub id: ClearAuditId,
    pub schedule_date: NaiveDate,
    pub appointment_count: i32,
    pub jobs_reset: Vec<JobId>,
    pub cleared_by: Option<StaffId>,
    pub cleared_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl From<ScheduleClearAudit> for ClearAuditDto {
    fn from(audit: ScheduleClearAudit) -> Self {
        Self {
            id: audit.id,
            schedule_date: audit.schedule_date,
            appointment_count: audit.appointment_count,
            jobs_reset: audit.jobs_reset,
            cleared_by: audit.cleared_by,
            cleared_at: audit.cleared_at,
            notes: audit.notes,
        }
    }
}

pub struct ScheduleClearService {
    repository: Arc<dyn FullRepository>,
}

impl ScheduleClearService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// Snapshot and delete every appointment on `date`, resetting the
    /// associated jobs to approved. One transaction; the audit row is the
    /// recovery record.
    pub async fn clear_schedule(
        &self,
        date: NaiveDate,
        cleared_by: Option<StaffId>,
        notes: Option<String>,
    ) -> ServiceResult<ScheduleClearResponse> {
        let audit = self.repository.clear_day(date, cleared_by, notes).await?;
        Ok(ScheduleClearResponse {
            audit_id: audit.id,
            schedule_date: date,
            appointments_cleared: audit.appointment_count,
            message: format!(
                "Cleared {} appointment(s) on {}; {} job(s) reset to approved",
                audit.appointment_count,
                date,
                audit.jobs_reset.len()
            ),
            jobs_reset: audit.jobs_reset,
        })
    }

    /// Most recent clear operations, newest first. Read-only.
    pub async fn recent_clears(&self, limit: usize) -> ServiceResult<Vec<ClearAuditDto>> {
        Ok(self
            .repository
            .list_recent_clears(limit)
            .await?
            .into_iter()
            .map(ClearAuditDto::from)
            .collect())
    }

    /// Decode an audit row's snapshot blob, verifying its checksum.
    ///
    /// This is the reconstruction input: replaying the snapshot into the
    /// scheduler reproduces the cleared assignments.
    pub async fn decode_snapshot(&self, audit_id: ClearAuditId) -> ServiceResult<ScheduleSnapshot> {
        let audit = self.repository.get_clear_audit(audit_id).await?;

        if !crate::db::checksum::verify_snapshot_blob(
            &audit.appointments_data,
            &audit.snapshot_checksum,
        ) {
            return Err(ServiceError::Internal(format!(
                "snapshot checksum mismatch for audit {}",
                audit_id
            )));
        }

        ScheduleSnapshot::from_json(&audit.appointments_data)
            .map_err(|e| ServiceError::Internal(format!("undecodable snapshot blob: {}", e)))
    }
}
