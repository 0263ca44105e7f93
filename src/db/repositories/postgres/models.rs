//! Diesel row structs and conversions to/from domain entities.
//!
//! Enum columns are stored as text; string lists as JSONB arrays. Every
//! conversion from a row is fallible because the database may carry values
//! written by newer code.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use super::schema::*;
use crate::api::{
    AppointmentId, Cents, ClearAuditId, CustomerId, GeoPoint, InvoiceId, JobId, LeadId,
    PropertyId, ReassignmentId, ServiceOfferingId, StaffId, WaitlistEntryId,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    Appointment, Customer, Invoice, Job, JobPriority, JobStatusHistory, Lead, Property,
    ScheduleClearAudit, ScheduleReassignment, ServiceOffering, Staff, StaffAvailability,
    WaitlistEntry,
};

pub(super) fn string_list_to_json(values: &[String]) -> Value {
    serde_json::to_value(values).unwrap_or_else(|_| Value::Array(vec![]))
}

pub(super) fn json_to_string_list(value: &Value) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn parse_enum<T: std::str::FromStr<Err = String>>(raw: &str, column: &str) -> RepositoryResult<T> {
    raw.parse()
        .map_err(|e| RepositoryError::internal(format!("bad {} value: {}", column, e)))
}

fn geo_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
        }),
        _ => None,
    }
}

// ==================== customers ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = customers)]
pub struct CustomerRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerRow {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id.value(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            is_active: c.is_active,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl From<CustomerRow> for Customer {
    fn from(r: CustomerRow) -> Self {
        Customer {
            id: CustomerId(r.id),
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            phone: r.phone,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

// ==================== properties ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = properties)]
pub struct PropertyRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub zone_count: Option<i32>,
    pub system_type: String,
    pub property_type: String,
    pub is_primary: bool,
    pub access_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Property> for PropertyRow {
    fn from(p: &Property) -> Self {
        Self {
            id: p.id.value(),
            customer_id: p.customer_id.value(),
            address: p.address.clone(),
            city: p.city.clone(),
            state: p.state.clone(),
            zip_code: p.zip_code.clone(),
            latitude: p.location.map(|l| l.latitude),
            longitude: p.location.map(|l| l.longitude),
            zone_count: p.zone_count,
            system_type: serde_plain_str(&p.system_type),
            property_type: serde_plain_str(&p.property_type),
            is_primary: p.is_primary,
            access_notes: p.access_notes.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

impl TryFrom<PropertyRow> for Property {
    type Error = RepositoryError;

    fn try_from(r: PropertyRow) -> RepositoryResult<Self> {
        Ok(Property {
            id: PropertyId(r.id),
            customer_id: CustomerId(r.customer_id),
            address: r.address,
            city: r.city,
            state: r.state,
            zip_code: r.zip_code,
            location: geo_point(r.latitude, r.longitude),
            zone_count: r.zone_count,
            system_type: serde_plain_parse(&r.system_type, "system_type")?,
            property_type: serde_plain_parse(&r.property_type, "property_type")?,
            is_primary: r.is_primary,
            access_notes: r.access_notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Serialize a unit-variant enum through serde to its snake_case string.
fn serde_plain_str<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn serde_plain_parse<T: serde::de::DeserializeOwned>(
    raw: &str,
    column: &str,
) -> RepositoryResult<T> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|e| RepositoryError::internal(format!("bad {} value: {}", column, e)))
}

// ==================== leads ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = leads)]
pub struct LeadRow {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub zip_code: Option<String>,
    pub source: String,
    pub notes: Option<String>,
    pub converted_customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&Lead> for LeadRow {
    fn from(l: &Lead) -> Self {
        Self {
            id: l.id.value(),
            name: l.name.clone(),
            phone: l.phone.clone(),
            email: l.email.clone(),
            zip_code: l.zip_code.clone(),
            source: serde_plain_str(&l.source),
            notes: l.notes.clone(),
            converted_customer_id: l.converted_customer_id.map(|c| c.value()),
            created_at: l.created_at,
        }
    }
}

impl TryFrom<LeadRow> for Lead {
    type Error = RepositoryError;

    fn try_from(r: LeadRow) -> RepositoryResult<Self> {
        Ok(Lead {
            id: LeadId(r.id),
            name: r.name,
            phone: r.phone,
            email: r.email,
            zip_code: r.zip_code,
            source: serde_plain_parse(&r.source, "source")?,
            notes: r.notes,
            converted_customer_id: r.converted_customer_id.map(CustomerId),
            created_at: r.created_at,
        })
    }
}

// ==================== service_offerings ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = service_offerings)]
pub struct ServiceOfferingRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub pricing_model: String,
    pub base_price_cents: i64,
    pub price_per_zone_cents: i64,
    pub base_duration_minutes: i32,
    pub duration_per_zone_minutes: i32,
    pub staffing_required: i16,
    pub equipment_required: Value,
    pub buffer_minutes: i32,
    pub lien_eligible: bool,
    pub requires_prepay: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ServiceOffering> for ServiceOfferingRow {
    fn from(o: &ServiceOffering) -> Self {
        Self {
            id: o.id.value(),
            name: o.name.clone(),
            category: o.category.as_str().to_string(),
            description: o.description.clone(),
            pricing_model: o.pricing_model.as_str().to_string(),
            base_price_cents: o.base_price.value(),
            price_per_zone_cents: o.price_per_zone.value(),
            base_duration_minutes: o.base_duration_minutes as i32,
            duration_per_zone_minutes: o.duration_per_zone_minutes as i32,
            staffing_required: o.staffing_required as i16,
            equipment_required: string_list_to_json(&o.equipment_required),
            buffer_minutes: o.buffer_minutes as i32,
            lien_eligible: o.lien_eligible,
            requires_prepay: o.requires_prepay,
            is_active: o.is_active,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

impl TryFrom<ServiceOfferingRow> for ServiceOffering {
    type Error = RepositoryError;

    fn try_from(r: ServiceOfferingRow) -> RepositoryResult<Self> {
        Ok(ServiceOffering {
            id: ServiceOfferingId(r.id),
            name: r.name,
            category: parse_enum(&r.category, "category")?,
            description: r.description,
            pricing_model: parse_enum(&r.pricing_model, "pricing_model")?,
            base_price: Cents::new(r.base_price_cents),
            price_per_zone: Cents::new(r.price_per_zone_cents),
            base_duration_minutes: r.base_duration_minutes.max(0) as u32,
            duration_per_zone_minutes: r.duration_per_zone_minutes.max(0) as u32,
            staffing_required: r.staffing_required.max(1) as u8,
            equipment_required: json_to_string_list(&r.equipment_required),
            buffer_minutes: r.buffer_minutes.max(0) as u32,
            lien_eligible: r.lien_eligible,
            requires_prepay: r.requires_prepay,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

// ==================== staff ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = staff)]
pub struct StaffRow {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub skill_level: i16,
    pub certifications: Value,
    pub assigned_equipment: Value,
    pub start_latitude: Option<f64>,
    pub start_longitude: Option<f64>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Staff> for StaffRow {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id.value(),
            name: s.name.clone(),
            role: s.role.as_str().to_string(),
            skill_level: s.skill_level,
            certifications: string_list_to_json(&s.certifications),
            assigned_equipment: string_list_to_json(&s.assigned_equipment),
            start_latitude: s.start_location.map(|l| l.latitude),
            start_longitude: s.start_location.map(|l| l.longitude),
            email: s.email.clone(),
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl TryFrom<StaffRow> for Staff {
    type Error = RepositoryError;

    fn try_from(r: StaffRow) -> RepositoryResult<Self> {
        Ok(Staff {
            id: StaffId(r.id),
            name: r.name,
            role: parse_enum(&r.role, "role")?,
            skill_level: r.skill_level,
            certifications: json_to_string_list(&r.certifications),
            assigned_equipment: json_to_string_list(&r.assigned_equipment),
            start_location: geo_point(r.start_latitude, r.start_longitude),
            email: r.email,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

// ==================== staff_availability ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = staff_availability)]
pub struct StaffAvailabilityRow {
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub lunch_start: Option<NaiveTime>,
    pub lunch_duration_minutes: i16,
    pub is_available: bool,
}

impl From<&StaffAvailability> for StaffAvailabilityRow {
    fn from(a: &StaffAvailability) -> Self {
        Self {
            staff_id: a.staff_id.value(),
            date: a.date,
            window_start: a.window_start,
            window_end: a.window_end,
            lunch_start: a.lunch_start,
            lunch_duration_minutes: a.lunch_duration_minutes as i16,
            is_available: a.is_available,
        }
    }
}

impl From<StaffAvailabilityRow> for StaffAvailability {
    fn from(r: StaffAvailabilityRow) -> Self {
        StaffAvailability {
            staff_id: StaffId(r.staff_id),
            date: r.date,
            window_start: r.window_start,
            window_end: r.window_end,
            lunch_start: r.lunch_start,
            lunch_duration_minutes: r.lunch_duration_minutes.max(0) as u16,
            is_available: r.is_available,
        }
    }
}

// ==================== jobs ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = jobs)]
pub struct JobRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub property_id: Uuid,
    pub service_offering_id: Uuid,
    pub category: String,
    pub status: String,
    pub priority: i16,
    pub estimated_duration_minutes: i32,
    pub equipment_required: Value,
    pub staff_required: i16,
    pub buffer_minutes: i32,
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    pub price_snapshot_cents: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobRow {
    fn from(j: &Job) -> Self {
        Self {
            id: j.id.value(),
            customer_id: j.customer_id.value(),
            property_id: j.property_id.value(),
            service_offering_id: j.service_offering_id.value(),
            category: j.category.as_str().to_string(),
            status: j.status.as_str().to_string(),
            priority: i16::from(j.priority.value()),
            estimated_duration_minutes: j.estimated_duration_minutes as i32,
            equipment_required: string_list_to_json(&j.equipment_required),
            staff_required: i16::from(j.staff_required),
            buffer_minutes: j.buffer_minutes as i32,
            preferred_time_start: j.preferred_time_start,
            preferred_time_end: j.preferred_time_end,
            price_snapshot_cents: j.price_snapshot.map(|c| c.value()),
            notes: j.notes.clone(),
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(r: JobRow) -> RepositoryResult<Self> {
        Ok(Job {
            id: JobId(r.id),
            customer_id: CustomerId(r.customer_id),
            property_id: PropertyId(r.property_id),
            service_offering_id: ServiceOfferingId(r.service_offering_id),
            category: parse_enum(&r.category, "category")?,
            status: parse_enum(&r.status, "status")?,
            priority: JobPriority::new(r.priority.clamp(0, 3) as u8),
            estimated_duration_minutes: r.estimated_duration_minutes.max(0) as u32,
            equipment_required: json_to_string_list(&r.equipment_required),
            staff_required: r.staff_required.max(1) as u8,
            buffer_minutes: r.buffer_minutes.max(0) as u32,
            preferred_time_start: r.preferred_time_start,
            preferred_time_end: r.preferred_time_end,
            price_snapshot: r.price_snapshot_cents.map(Cents::new),
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

// ==================== job_status_history ====================

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = job_status_history)]
pub struct JobStatusHistoryRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub previous_status: Option<String>,
    pub new_status: String,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl From<&JobStatusHistory> for JobStatusHistoryRow {
    fn from(h: &JobStatusHistory) -> Self {
        Self {
            id: h.id,
            job_id: h.job_id.value(),
            previous_status: h.previous_status.map(|s| s.as_str().to_string()),
            new_status: h.new_status.as_str().to_string(),
            changed_at: h.changed_at,
            changed_by: h.changed_by.map(|s| s.value()),
            notes: h.notes.clone(),
        }
    }
}

impl TryFrom<JobStatusHistoryRow> for JobStatusHistory {
    type Error = RepositoryError;

    fn try_from(r: JobStatusHistoryRow) -> RepositoryResult<Self> {
        Ok(JobStatusHistory {
            id: r.id,
            job_id: JobId(r.job_id),
            previous_status: r
                .previous_status
                .as_deref()
                .map(|s| parse_enum(s, "previous_status"))
                .transpose()?,
            new_status: parse_enum(&r.new_status, "new_status")?,
            changed_at: r.changed_at,
            changed_by: r.changed_by.map(StaffId),
            notes: r.notes,
        })
    }
}

// ==================== appointments ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = appointments)]
pub struct AppointmentRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub route_order: i32,
    pub travel_minutes: i32,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_from: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentRow {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id.value(),
            job_id: a.job_id.value(),
            staff_id: a.staff_id.value(),
            date: a.date,
            start_time: a.start_time,
            end_time: a.end_time,
            status: a.status.as_str().to_string(),
            route_order: a.route_order,
            travel_minutes: a.travel_minutes as i32,
            arrived_at: a.arrived_at,
            completed_at: a.completed_at,
            cancelled_at: a.cancelled_at,
            cancellation_reason: a.cancellation_reason.clone(),
            rescheduled_from: a.rescheduled_from.map(|i| i.value()),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = RepositoryError;

    fn try_from(r: AppointmentRow) -> RepositoryResult<Self> {
        Ok(Appointment {
            id: AppointmentId(r.id),
            job_id: JobId(r.job_id),
            staff_id: StaffId(r.staff_id),
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            status: parse_enum(&r.status, "status")?,
            route_order: r.route_order,
            travel_minutes: r.travel_minutes.max(0) as u32,
            arrived_at: r.arrived_at,
            completed_at: r.completed_at,
            cancelled_at: r.cancelled_at,
            cancellation_reason: r.cancellation_reason,
            rescheduled_from: r.rescheduled_from.map(AppointmentId),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

// ==================== schedule_waitlist ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = schedule_waitlist)]
pub struct WaitlistRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub preferred_date: NaiveDate,
    pub preferred_time_start: Option<NaiveTime>,
    pub preferred_time_end: Option<NaiveTime>,
    pub priority: i16,
    pub notes: Option<String>,
    pub notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&WaitlistEntry> for WaitlistRow {
    fn from(w: &WaitlistEntry) -> Self {
        Self {
            id: w.id.value(),
            job_id: w.job_id.value(),
            preferred_date: w.preferred_date,
            preferred_time_start: w.preferred_time_start,
            preferred_time_end: w.preferred_time_end,
            priority: i16::from(w.priority.value()),
            notes: w.notes.clone(),
            notified_at: w.notified_at,
            created_at: w.created_at,
        }
    }
}

impl From<WaitlistRow> for WaitlistEntry {
    fn from(r: WaitlistRow) -> Self {
        WaitlistEntry {
            id: WaitlistEntryId(r.id),
            job_id: JobId(r.job_id),
            preferred_date: r.preferred_date,
            preferred_time_start: r.preferred_time_start,
            preferred_time_end: r.preferred_time_end,
            priority: JobPriority::new(r.priority.clamp(0, 3) as u8),
            notes: r.notes,
            notified_at: r.notified_at,
            created_at: r.created_at,
        }
    }
}

// ==================== schedule_reassignments ====================

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = schedule_reassignments)]
pub struct ReassignmentRow {
    pub id: Uuid,
    pub original_staff_id: Uuid,
    pub new_staff_id: Uuid,
    pub reassignment_date: NaiveDate,
    pub reason: String,
    pub jobs_reassigned: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&ScheduleReassignment> for ReassignmentRow {
    fn from(r: &ScheduleReassignment) -> Self {
        Self {
            id: r.id.value(),
            original_staff_id: r.original_staff_id.value(),
            new_staff_id: r.new_staff_id.value(),
            reassignment_date: r.reassignment_date,
            reason: r.reason.clone(),
            jobs_reassigned: r.jobs_reassigned as i32,
            notes: r.notes.clone(),
            created_at: r.created_at,
        }
    }
}

impl From<ReassignmentRow> for ScheduleReassignment {
    fn from(r: ReassignmentRow) -> Self {
        ScheduleReassignment {
            id: ReassignmentId(r.id),
            original_staff_id: StaffId(r.original_staff_id),
            new_staff_id: StaffId(r.new_staff_id),
            reassignment_date: r.reassignment_date,
            reason: r.reason,
            jobs_reassigned: r.jobs_reassigned.max(0) as u32,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

// ==================== schedule_clear_audit ====================

#[derive(Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = schedule_clear_audit)]
pub struct ClearAuditRow {
    pub id: Uuid,
    pub schedule_date: NaiveDate,
    pub appointments_data: Value,
    pub snapshot_checksum: String,
    pub jobs_reset: Value,
    pub appointment_count: i32,
    pub cleared_by: Option<Uuid>,
    pub cleared_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl From<&ScheduleClearAudit> for ClearAuditRow {
    fn from(a: &ScheduleClearAudit) -> Self {
        Self {
            id: a.id.value(),
            schedule_date: a.schedule_date,
            appointments_data: a.appointments_data.clone(),
            snapshot_checksum: a.snapshot_checksum.clone(),
            jobs_reset: serde_json::to_value(&a.jobs_reset).unwrap_or(Value::Array(vec![])),
            appointment_count: a.appointment_count,
            cleared_by: a.cleared_by.map(|s| s.value()),
            cleared_at: a.cleared_at,
            notes: a.notes.clone(),
        }
    }
}

impl From<ClearAuditRow> for ScheduleClearAudit {
    fn from(r: ClearAuditRow) -> Self {
        ScheduleClearAudit {
            id: ClearAuditId(r.id),
            schedule_date: r.schedule_date,
            appointments_data: r.appointments_data,
            snapshot_checksum: r.snapshot_checksum,
            jobs_reset: serde_json::from_value(r.jobs_reset).unwrap_or_default(),
            appointment_count: r.appointment_count,
            cleared_by: r.cleared_by.map(StaffId),
            cleared_at: r.cleared_at,
            notes: r.notes,
        }
    }
}

// ==================== invoices ====================

#[derive(Queryable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = invoices)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub customer_id: Uuid,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub late_fee_cents: i64,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount_cents: i64,
    pub reminder_count: i32,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub lien_eligible: bool,
    pub lien_warning_sent: Option<DateTime<Utc>>,
    pub lien_filed_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Invoice> for InvoiceRow {
    fn from(i: &Invoice) -> Self {
        Self {
            id: i.id.value(),
            job_id: i.job_id.value(),
            customer_id: i.customer_id.value(),
            invoice_number: i.invoice_number.clone(),
            amount_cents: i.amount.value(),
            late_fee_cents: i.late_fee.value(),
            invoice_date: i.invoice_date,
            due_date: i.due_date,
            status: i.status.as_str().to_string(),
            payment_method: i.payment_method.map(|m| serde_plain_str(&m)),
            paid_at: i.paid_at,
            paid_amount_cents: i.paid_amount.value(),
            reminder_count: i.reminder_count as i32,
            last_reminder_sent: i.last_reminder_sent,
            lien_eligible: i.lien_eligible,
            lien_warning_sent: i.lien_warning_sent,
            lien_filed_date: i.lien_filed_date,
            notes: i.notes.clone(),
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = RepositoryError;

    fn try_from(r: InvoiceRow) -> RepositoryResult<Self> {
        Ok(Invoice {
            id: InvoiceId(r.id),
            job_id: JobId(r.job_id),
            customer_id: CustomerId(r.customer_id),
            invoice_number: r.invoice_number,
            amount: Cents::new(r.amount_cents),
            late_fee: Cents::new(r.late_fee_cents),
            invoice_date: r.invoice_date,
            due_date: r.due_date,
            status: parse_enum(&r.status, "status")?,
            payment_method: r
                .payment_method
                .as_deref()
                .map(|m| serde_plain_parse(m, "payment_method"))
                .transpose()?,
            paid_at: r.paid_at,
            paid_amount: Cents::new(r.paid_amount_cents),
            reminder_count: r.reminder_count.max(0) as u32,
            last_reminder_sent: r.last_reminder_sent,
            lien_eligible: r.lien_eligible,
            lien_warning_sent: r.lien_warning_sent,
            lien_filed_date: r.lien_filed_date,
            notes: r.notes,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
