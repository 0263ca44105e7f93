//! Data Transfer Objects for the HTTP API.
//!
//! Request bodies live here; response DTOs are defined next to the
//! services that produce them and re-exported for the handlers.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::{JobId, StaffId};

pub use crate::services::conflict_resolution::{
    CancelAppointmentResponse, FillGapResponse, FillGapSuggestion, RescheduleAppointmentResponse,
    WaitlistEntryDto,
};
pub use crate::services::emergency::EmergencyInsertResponse;
pub use crate::services::reassignment::{
    CoverageOption, CoverageOptionsResponse, MarkUnavailableResponse, ReassignStaffResponse,
};
pub use crate::services::schedule_clear::{ClearAuditDto, ScheduleClearResponse};
pub use crate::services::schedule_generation::{
    ScheduleCapacityResponse, ScheduleGenerateResponse, ScheduleJobAssignment,
    ScheduleStaffAssignment, UnassignedJobDto,
};

fn default_generate_timeout() -> u64 {
    30
}

fn default_reoptimize_timeout() -> u64 {
    15
}

fn default_priority_level() -> u8 {
    2
}

/// Request to generate a schedule for a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGenerateRequest {
    pub schedule_date: NaiveDate,
    #[serde(default = "default_generate_timeout")]
    pub timeout_seconds: u64,
}

/// Request to re-optimize an existing schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReoptimizeRequest {
    pub target_date: NaiveDate,
    #[serde(default = "default_reoptimize_timeout")]
    pub timeout_seconds: u64,
}

/// Request to insert an emergency job into an existing schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyInsertRequest {
    pub job_id: JobId,
    pub target_date: NaiveDate,
    /// 2 = urgent, 3 = emergency.
    #[serde(default = "default_priority_level")]
    pub priority_level: u8,
}

/// Request to cancel an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    #[serde(default)]
    pub add_to_waitlist: bool,
    #[serde(default)]
    pub preferred_reschedule_date: Option<NaiveDate>,
}

/// Request to reschedule an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time_start: NaiveTime,
    pub new_time_end: NaiveTime,
    #[serde(default)]
    pub new_staff_id: Option<StaffId>,
}

/// Request to fill a schedule gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillGapRequest {
    pub target_date: NaiveDate,
    pub gap_start: NaiveTime,
    pub gap_end: NaiveTime,
    #[serde(default)]
    pub staff_id: Option<StaffId>,
}

/// Request to mark staff as unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkUnavailableRequest {
    pub target_date: NaiveDate,
    pub reason: String,
}

/// Request to reassign jobs from one staff to another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignStaffRequest {
    pub original_staff_id: StaffId,
    pub new_staff_id: StaffId,
    pub target_date: NaiveDate,
    pub reason: String,
}

/// Request to clear a date's schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleClearRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `?date=` query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

/// Waitlist listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistResponse {
    pub target_date: NaiveDate,
    pub entries: Vec<WaitlistEntryDto>,
    pub total: usize,
}

/// Recent clears listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentClearsResponse {
    pub clears: Vec<ClearAuditDto>,
    pub total: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Maximum free-text reason length accepted by the API.
pub const MAX_REASON_LENGTH: usize = 500;
