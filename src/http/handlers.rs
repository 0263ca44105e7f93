//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint, builds its service from
//! the shared state, and delegates to the service layer.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use crate::api::{AppointmentId, StaffId};
use crate::services::{
    ConflictResolutionService, EmergencyService, ReassignmentService, ScheduleClearService,
    ScheduleGenerationService,
};

use super::auth::resolve_actor;
use super::dto::{
    CancelAppointmentRequest, CancelAppointmentResponse, CoverageOptionsResponse, DateQuery,
    EmergencyInsertRequest, EmergencyInsertResponse, FillGapRequest, FillGapResponse,
    HealthResponse, MarkUnavailableRequest, MarkUnavailableResponse, ReassignStaffRequest,
    ReassignStaffResponse, RecentClearsResponse, ReoptimizeRequest,
    RescheduleAppointmentRequest, RescheduleAppointmentResponse, ScheduleCapacityResponse,
    ScheduleClearRequest, ScheduleClearResponse, ScheduleGenerateRequest,
    ScheduleGenerateResponse, WaitlistResponse, MAX_REASON_LENGTH,
};
use super::error::AppError;
use super::state::AppState;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

fn validate_reason(reason: &str) -> Result<(), AppError> {
    if reason.trim().is_empty() || reason.len() > MAX_REASON_LENGTH {
        return Err(AppError::BadRequest(format!(
            "reason must be 1..={} characters",
            MAX_REASON_LENGTH
        )));
    }
    Ok(())
}

fn actor(state: &AppState, headers: &HeaderMap) -> Result<Option<StaffId>, AppError> {
    resolve_actor(state.auth.as_deref(), headers)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Schedule generation
// =============================================================================

/// POST /v1/schedule/generate
pub async fn generate_schedule(
    State(state): State<AppState>,
    Json(request): Json<ScheduleGenerateRequest>,
) -> HandlerResult<ScheduleGenerateResponse> {
    let service = ScheduleGenerationService::new(state.repository, state.travel);
    let response = service
        .generate(request.schedule_date, request.timeout_seconds, None)
        .await?;
    Ok(Json(response))
}

/// GET /v1/schedule/capacity?date=
pub async fn get_capacity(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> HandlerResult<ScheduleCapacityResponse> {
    let service = ScheduleGenerationService::new(state.repository, state.travel);
    Ok(Json(service.capacity(query.date).await?))
}

/// POST /v1/schedule/reoptimize
pub async fn reoptimize_schedule(
    State(state): State<AppState>,
    Json(request): Json<ReoptimizeRequest>,
) -> HandlerResult<ScheduleGenerateResponse> {
    let service = ScheduleGenerationService::new(state.repository, state.travel);
    let response = service
        .reoptimize(request.target_date, request.timeout_seconds, None)
        .await?;
    Ok(Json(response))
}

/// POST /v1/schedule/emergency-insert
pub async fn emergency_insert(
    State(state): State<AppState>,
    Json(request): Json<EmergencyInsertRequest>,
) -> HandlerResult<EmergencyInsertResponse> {
    if request.priority_level > 3 {
        return Err(AppError::BadRequest(
            "priority_level must be 0..=3".to_string(),
        ));
    }
    let service = EmergencyService::new(state.repository, state.travel);
    let response = service
        .insert_emergency_job(request.job_id, request.target_date, request.priority_level)
        .await?;
    Ok(Json(response))
}

// =============================================================================
// Conflict resolution
// =============================================================================

/// POST /v1/appointments/{id}/cancel
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<uuid::Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> HandlerResult<CancelAppointmentResponse> {
    validate_reason(&request.reason)?;
    let service = ConflictResolutionService::new(state.repository);
    let response = service
        .cancel_appointment(
            AppointmentId(appointment_id),
            &request.reason,
            request.add_to_waitlist,
            request.preferred_reschedule_date,
        )
        .await?;
    Ok(Json(response))
}

/// POST /v1/appointments/{id}/reschedule
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<uuid::Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> HandlerResult<RescheduleAppointmentResponse> {
    let service = ConflictResolutionService::new(state.repository);
    let response = service
        .reschedule_appointment(
            AppointmentId(appointment_id),
            request.new_date,
            request.new_time_start,
            request.new_time_end,
            request.new_staff_id,
        )
        .await?;
    Ok(Json(response))
}

/// GET /v1/schedule/waitlist?date=
pub async fn get_waitlist(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> HandlerResult<WaitlistResponse> {
    let service = ConflictResolutionService::new(state.repository);
    let entries = service.waitlist(query.date).await?;
    Ok(Json(WaitlistResponse {
        target_date: query.date,
        total: entries.len(),
        entries,
    }))
}

/// POST /v1/schedule/fill-gap
pub async fn fill_gap(
    State(state): State<AppState>,
    Json(request): Json<FillGapRequest>,
) -> HandlerResult<FillGapResponse> {
    let service = ConflictResolutionService::new(state.repository);
    let response = service
        .fill_gap_suggestions(
            request.target_date,
            request.gap_start,
            request.gap_end,
            request.staff_id,
        )
        .await?;
    Ok(Json(response))
}

// =============================================================================
// Staff reassignment
// =============================================================================

/// POST /v1/staff/{id}/mark-unavailable
pub async fn mark_staff_unavailable(
    State(state): State<AppState>,
    Path(staff_id): Path<uuid::Uuid>,
    Json(request): Json<MarkUnavailableRequest>,
) -> HandlerResult<MarkUnavailableResponse> {
    validate_reason(&request.reason)?;
    let service = ReassignmentService::new(state.repository, state.travel);
    let response = service
        .mark_unavailable(StaffId(staff_id), request.target_date, &request.reason)
        .await?;
    Ok(Json(response))
}

/// POST /v1/schedule/reassign-staff
pub async fn reassign_staff(
    State(state): State<AppState>,
    Json(request): Json<ReassignStaffRequest>,
) -> HandlerResult<ReassignStaffResponse> {
    validate_reason(&request.reason)?;
    let service = ReassignmentService::new(state.repository, state.travel);
    let response = service
        .reassign(
            request.original_staff_id,
            request.new_staff_id,
            request.target_date,
            &request.reason,
        )
        .await?;
    Ok(Json(response))
}

/// GET /v1/schedule/coverage-options/{date}
pub async fn get_coverage_options(
    State(state): State<AppState>,
    Path(date): Path<chrono::NaiveDate>,
) -> HandlerResult<CoverageOptionsResponse> {
    let service = ReassignmentService::new(state.repository, state.travel);
    Ok(Json(service.coverage_options(date).await?))
}

// =============================================================================
// Clear and audit
// =============================================================================

/// POST /v1/schedule/clear
pub async fn clear_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ScheduleClearRequest>,
) -> HandlerResult<ScheduleClearResponse> {
    let cleared_by = actor(&state, &headers)?;
    let service = ScheduleClearService::new(state.repository);
    let response = service
        .clear_schedule(request.date, cleared_by, request.notes)
        .await?;
    Ok(Json(response))
}

/// GET /v1/schedule/clears/recent
pub async fn recent_clears(State(state): State<AppState>) -> HandlerResult<RecentClearsResponse> {
    let service = ScheduleClearService::new(state.repository);
    let clears = service.recent_clears(20).await?;
    Ok(Json(RecentClearsResponse {
        total: clears.len(),
        clears,
    }))
}
