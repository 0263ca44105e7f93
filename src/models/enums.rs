//! Enum types shared across the domain model.
//!
//! Every enum-typed database column is represented as a tagged Rust enum
//! with stable snake_case wire values. Status enums carry their legal
//! transition graph so services can reject illegal moves uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Job lifecycle status.
///
/// Legal transitions form a linear chain with `Cancelled` reachable from
/// any pre-terminal state:
///
/// ```text
/// requested -> approved -> scheduled -> in_progress -> completed -> closed
///      \___________\___________\____________\______________/
///                           cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Requested,
    Approved,
    Scheduled,
    InProgress,
    Completed,
    Closed,
    Cancelled,
}

impl JobStatus {
    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Requested, Approved)
            | (Approved, Scheduled)
            | (Scheduled, InProgress)
            | (InProgress, Completed)
            | (Completed, Closed) => true,
            // A scheduled job whose appointment was cancelled drops back.
            (Scheduled, Approved) => true,
            // Cancellation is reachable from every pre-terminal state.
            (Requested | Approved | Scheduled | InProgress, Cancelled) => true,
            _ => false,
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Closed | JobStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Requested => "requested",
            JobStatus::Approved => "approved",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Closed => "closed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(JobStatus::Requested),
            "approved" => Ok(JobStatus::Approved),
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "closed" => Ok(JobStatus::Closed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service category of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    Installation,
    Repair,
    Diagnostic,
    Seasonal,
    Landscaping,
}

impl JobCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            JobCategory::Installation => "installation",
            JobCategory::Repair => "repair",
            JobCategory::Diagnostic => "diagnostic",
            JobCategory::Seasonal => "seasonal",
            JobCategory::Landscaping => "landscaping",
        }
    }
}

impl FromStr for JobCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installation" => Ok(JobCategory::Installation),
            "repair" => Ok(JobCategory::Repair),
            "diagnostic" => Ok(JobCategory::Diagnostic),
            "seasonal" => Ok(JobCategory::Seasonal),
            "landscaping" => Ok(JobCategory::Landscaping),
            _ => Err(format!("Unknown job category: {}", s)),
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appointment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Only not-yet-started appointments may be cancelled or rescheduled.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    /// Appointments at or past confirmation are pinned during re-optimization.
    pub fn is_pinned(self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(format!("Unknown appointment status: {}", s)),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    PartiallyPaid,
    Paid,
    Overdue,
    Void,
}

impl InvoiceStatus {
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, next) {
            (Draft, Sent) => true,
            (Sent, Viewed) | (Sent, Overdue) => true,
            (Viewed, Overdue) => true,
            // Payments can arrive in any open state.
            (Sent | Viewed | PartiallyPaid | Overdue, PartiallyPaid) => true,
            (Sent | Viewed | PartiallyPaid | Overdue, Paid) => true,
            (PartiallyPaid, Overdue) => true,
            // Void is reachable from any unpaid state.
            (Draft | Sent | Viewed | PartiallyPaid | Overdue, Void) => true,
            _ => false,
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, InvoiceStatus::Paid | InvoiceStatus::Void)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Void => "void",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "viewed" => Ok(InvoiceStatus::Viewed),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "void" => Ok(InvoiceStatus::Void),
            _ => Err(format!("Unknown invoice status: {}", s)),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pricing model of a service offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Flat,
    ZoneBased,
    Hourly,
    Custom,
}

impl PricingModel {
    pub fn as_str(self) -> &'static str {
        match self {
            PricingModel::Flat => "flat",
            PricingModel::ZoneBased => "zone_based",
            PricingModel::Hourly => "hourly",
            PricingModel::Custom => "custom",
        }
    }
}

impl FromStr for PricingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(PricingModel::Flat),
            "zone_based" => Ok(PricingModel::ZoneBased),
            "hourly" => Ok(PricingModel::Hourly),
            "custom" => Ok(PricingModel::Custom),
            _ => Err(format!("Unknown pricing model: {}", s)),
        }
    }
}

/// Staff role. Only `Tech` participates in routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Tech,
    Sales,
    Admin,
}

impl StaffRole {
    pub fn is_routable(self) -> bool {
        matches!(self, StaffRole::Tech)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StaffRole::Tech => "tech",
            StaffRole::Sales => "sales",
            StaffRole::Admin => "admin",
        }
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tech" => Ok(StaffRole::Tech),
            "sales" => Ok(StaffRole::Sales),
            "admin" => Ok(StaffRole::Admin),
            _ => Err(format!("Unknown staff role: {}", s)),
        }
    }
}

/// Irrigation system type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemType {
    #[default]
    Standard,
    LakePump,
}

/// Property type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    Residential,
    Commercial,
}

/// Lead source for marketing attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Website,
    Google,
    Referral,
    Ad,
    WordOfMouth,
}

/// Method of invoice payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    Card,
    BankTransfer,
    OnSite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_linear_chain() {
        assert!(JobStatus::Requested.can_transition_to(JobStatus::Approved));
        assert!(JobStatus::Approved.can_transition_to(JobStatus::Scheduled));
        assert!(JobStatus::Scheduled.can_transition_to(JobStatus::InProgress));
        assert!(JobStatus::InProgress.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Completed.can_transition_to(JobStatus::Closed));
    }

    #[test]
    fn job_status_rejects_skips_and_backwards() {
        assert!(!JobStatus::Requested.can_transition_to(JobStatus::Scheduled));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Approved));
        assert!(!JobStatus::Closed.can_transition_to(JobStatus::Cancelled));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Requested));
    }

    #[test]
    fn job_status_cancel_branch() {
        for s in [
            JobStatus::Requested,
            JobStatus::Approved,
            JobStatus::Scheduled,
            JobStatus::InProgress,
        ] {
            assert!(s.can_transition_to(JobStatus::Cancelled), "{s} -> cancelled");
        }
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Cancelled));
    }

    #[test]
    fn scheduled_falls_back_to_approved() {
        assert!(JobStatus::Scheduled.can_transition_to(JobStatus::Approved));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            JobStatus::Requested,
            JobStatus::Approved,
            JobStatus::Scheduled,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Closed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(s.as_str().parse::<JobStatus>().unwrap(), s);
        }
    }

    #[test]
    fn invoice_paid_is_terminal_for_payments() {
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Void));
        assert!(InvoiceStatus::Overdue.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Sent.can_transition_to(InvoiceStatus::PartiallyPaid));
    }

    #[test]
    fn appointment_cancellable_states() {
        assert!(AppointmentStatus::Scheduled.is_cancellable());
        assert!(AppointmentStatus::Confirmed.is_cancellable());
        assert!(!AppointmentStatus::InProgress.is_cancellable());
        assert!(!AppointmentStatus::Completed.is_cancellable());
    }
}
