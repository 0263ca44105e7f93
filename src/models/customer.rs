//! Customer, lead, and property records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{CustomerId, GeoPoint, LeadId, PropertyId};

use super::enums::{LeadSource, PropertyType, SystemType};

/// A paying customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    /// Normalized via `contact::normalize_phone`.
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An inbound lead, convertible to a customer exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub zip_code: Option<String>,
    pub source: LeadSource,
    pub notes: Option<String>,
    /// Set when the lead has been converted; converting again is rejected.
    pub converted_customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    pub fn is_converted(&self) -> bool {
        self.converted_customer_id.is_some()
    }
}

/// Bounds for `Property::zone_count`.
pub const ZONE_COUNT_RANGE: std::ops::RangeInclusive<i32> = 1..=50;

/// A geo-located service site owned by a customer.
///
/// At most one property per customer carries the `is_primary` flag;
/// flipping it is atomic across the customer's properties (repository
/// responsibility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub customer_id: CustomerId,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub location: Option<GeoPoint>,
    /// Number of irrigation zones, 1..=50 when present.
    pub zone_count: Option<i32>,
    pub system_type: SystemType,
    pub property_type: PropertyType,
    pub is_primary: bool,
    pub access_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Validate field constraints that the schema layer enforces.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(zones) = self.zone_count {
            if !ZONE_COUNT_RANGE.contains(&zones) {
                return Err(format!("zone_count {} outside 1..=50", zones));
            }
        }
        if let Some(ref zip) = self.zip_code {
            if !super::contact::validate_zip(zip) {
                return Err(format!("invalid zip code: {}", zip));
            }
        }
        Ok(())
    }

    pub fn has_coordinates(&self) -> bool {
        self.location.is_some()
    }
}

/// Convenience constructor used by tests and seeds.
impl Property {
    pub fn new_at(customer_id: CustomerId, city: &str, point: GeoPoint) -> Self {
        let now = Utc::now();
        Self {
            id: PropertyId::new(),
            customer_id,
            address: String::new(),
            city: city.to_string(),
            state: "MN".to_string(),
            zip_code: None,
            location: Some(point),
            zone_count: None,
            system_type: SystemType::Standard,
            property_type: PropertyType::Residential,
            is_primary: false,
            access_notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Date helper used across the waitlist and scheduling code.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_zone_count_bounds() {
        let mut p = Property::new_at(CustomerId::new(), "Minneapolis", GeoPoint {
            latitude: 44.98,
            longitude: -93.26,
        });
        assert!(p.validate().is_ok());

        p.zone_count = Some(0);
        assert!(p.validate().is_err());
        p.zone_count = Some(50);
        assert!(p.validate().is_ok());
        p.zone_count = Some(51);
        assert!(p.validate().is_err());
    }

    #[test]
    fn date_parsing() {
        assert!(parse_date("2025-06-15").is_ok());
        assert!(parse_date("06/15/2025").is_err());
    }
}
