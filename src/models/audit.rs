//! Audit records: schedule clears, staff reassignments, sent messages.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{
    AppointmentId, ClearAuditId, JobId, MessageId, ReassignmentId, StaffId,
};

use super::appointment::Appointment;
use super::enums::AppointmentStatus;

/// Current snapshot schema version. Bump when `SnapshotAppointment` gains
/// fields; decoding stays lenient so older blobs keep loading.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One appointment captured in a pre-clear snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAppointment {
    pub appointment_id: AppointmentId,
    pub job_id: JobId,
    pub staff_id: StaffId,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub route_order: i32,
    pub travel_minutes: u32,
}

impl From<&Appointment> for SnapshotAppointment {
    fn from(a: &Appointment) -> Self {
        Self {
            appointment_id: a.id,
            job_id: a.job_id,
            staff_id: a.staff_id,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status,
            route_order: a.route_order,
            travel_minutes: a.travel_minutes,
        }
    }
}

/// Versioned snapshot of a day's appointments, stored as the audit blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default = "default_snapshot_version")]
    pub snapshot_version: u32,
    pub schedule_date: NaiveDate,
    pub appointments: Vec<SnapshotAppointment>,
}

fn default_snapshot_version() -> u32 {
    1
}

impl ScheduleSnapshot {
    pub fn capture(schedule_date: NaiveDate, appointments: &[Appointment]) -> Self {
        Self {
            snapshot_version: SNAPSHOT_VERSION,
            schedule_date,
            appointments: appointments.iter().map(SnapshotAppointment::from).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// Audit row written by the clear-and-audit store.
///
/// Sufficient to reconstruct the cleared day's assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleClearAudit {
    pub id: ClearAuditId,
    pub schedule_date: NaiveDate,
    pub appointments_data: serde_json::Value,
    /// sha256 over the serialized snapshot, for blob verification.
    pub snapshot_checksum: String,
    pub jobs_reset: Vec<JobId>,
    pub appointment_count: i32,
    pub cleared_by: Option<StaffId>,
    pub cleared_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Record of moving one staff's day to another staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleReassignment {
    pub id: ReassignmentId,
    pub original_staff_id: StaffId,
    pub new_staff_id: StaffId,
    pub reassignment_date: NaiveDate,
    pub reason: String,
    pub jobs_reassigned: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Record of an outbound customer notification. Delivery is handled by an
/// external provider; the core only records the send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: MessageId,
    pub recipient_phone: String,
    pub body: String,
    pub related_job_id: Option<JobId>,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trip() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let snapshot = ScheduleSnapshot {
            snapshot_version: SNAPSHOT_VERSION,
            schedule_date: date,
            appointments: vec![SnapshotAppointment {
                appointment_id: AppointmentId::new(),
                job_id: JobId::new(),
                staff_id: StaffId::new(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                status: AppointmentStatus::Scheduled,
                route_order: 0,
                travel_minutes: 12,
            }],
        };

        let json = snapshot.to_json();
        let decoded = ScheduleSnapshot::from_json(&json).unwrap();
        assert_eq!(decoded.appointments.len(), 1);
        assert_eq!(decoded.schedule_date, date);
    }

    #[test]
    fn unversioned_blob_defaults_to_v1() {
        // Blobs written before the version field was introduced.
        let json = serde_json::json!({
            "schedule_date": "2025-06-16",
            "appointments": []
        });
        let decoded = ScheduleSnapshot::from_json(&json).unwrap();
        assert_eq!(decoded.snapshot_version, 1);
    }
}
