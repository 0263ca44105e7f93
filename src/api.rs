//! Public API surface for the scheduling core.
//!
//! This file consolidates the identifier newtypes and shared value types
//! used across the repository, service, and HTTP layers. All types derive
//! Serialize/Deserialize for JSON serialization.

use serde::{Deserialize, Serialize};

use crate::define_id_type;

define_id_type!(CustomerId);
define_id_type!(PropertyId);
define_id_type!(LeadId);
define_id_type!(ServiceOfferingId);
define_id_type!(StaffId);
define_id_type!(JobId);
define_id_type!(AppointmentId);
define_id_type!(WaitlistEntryId);
define_id_type!(InvoiceId);
define_id_type!(ClearAuditId);
define_id_type!(ReassignmentId);
define_id_type!(MessageId);

/// Geographic point (latitude, longitude) in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("Latitude must be between -90 and 90 degrees".to_string());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("Longitude must be between -180 and 180 degrees".to_string());
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Money as integer cents. Avoids floating-point drift in invoice math.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Cents(pub i64);

impl Cents {
    pub fn new(value: i64) -> Self {
        Cents(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Cents(0)
    }

    pub fn saturating_add(self, other: Cents) -> Cents {
        Cents(self.0.saturating_add(other.0))
    }
}

impl std::ops::Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i64> for Cents {
    type Output = Cents;

    fn mul(self, rhs: i64) -> Cents {
        Cents(self.0 * rhs)
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_bounds() {
        assert!(GeoPoint::new(45.0, -93.2).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
    }

    #[test]
    fn cents_arithmetic_and_display() {
        let total = Cents::new(12_500) + Cents::new(2_500);
        assert_eq!(total, Cents::new(15_000));
        assert_eq!(total.to_string(), "150.00");
        assert_eq!(Cents::new(105).to_string(), "1.05");
    }

    #[test]
    fn id_round_trips_through_uuid() {
        let id = JobId::new();
        let raw: uuid::Uuid = id.into();
        assert_eq!(JobId::from(raw), id);
    }
}
