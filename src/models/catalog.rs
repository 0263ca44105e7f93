//! Service catalog records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Cents, ServiceOfferingId};

use super::enums::{JobCategory, PricingModel};

/// A catalog item describing a sellable service.
///
/// Duration and price derive from the pricing model: `zone_based`
/// offerings scale with the property's zone count, everything else uses
/// the base values as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub id: ServiceOfferingId,
    pub name: String,
    pub category: JobCategory,
    pub description: Option<String>,
    pub pricing_model: PricingModel,
    pub base_price: Cents,
    pub price_per_zone: Cents,
    pub base_duration_minutes: u32,
    pub duration_per_zone_minutes: u32,
    /// Number of techs that must be on site simultaneously.
    pub staffing_required: u8,
    pub equipment_required: Vec<String>,
    /// Extra minutes appended after service time for unmodelled transitions.
    pub buffer_minutes: u32,
    pub lien_eligible: bool,
    pub requires_prepay: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOffering {
    /// Estimated service duration for a site with `zone_count` zones.
    pub fn duration_for(&self, zone_count: Option<i32>) -> u32 {
        match self.pricing_model {
            PricingModel::ZoneBased => {
                let zones = zone_count.unwrap_or(1).max(0) as u32;
                self.base_duration_minutes + self.duration_per_zone_minutes * zones
            }
            _ => self.base_duration_minutes,
        }
    }

    /// Price snapshot for a site with `zone_count` zones.
    pub fn price_for(&self, zone_count: Option<i32>) -> Cents {
        match self.pricing_model {
            PricingModel::ZoneBased => {
                let zones = zone_count.unwrap_or(1).max(0) as i64;
                self.base_price + self.price_per_zone * zones
            }
            _ => self.base_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winterization() -> ServiceOffering {
        let now = Utc::now();
        ServiceOffering {
            id: ServiceOfferingId::new(),
            name: "Winterization".to_string(),
            category: JobCategory::Seasonal,
            description: None,
            pricing_model: PricingModel::ZoneBased,
            base_price: Cents::new(6_000),
            price_per_zone: Cents::new(500),
            base_duration_minutes: 30,
            duration_per_zone_minutes: 5,
            staffing_required: 1,
            equipment_required: vec!["compressor".to_string()],
            buffer_minutes: 10,
            lien_eligible: false,
            requires_prepay: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn zone_based_duration_and_price() {
        let offering = winterization();
        assert_eq!(offering.duration_for(Some(6)), 60);
        assert_eq!(offering.price_for(Some(6)), Cents::new(9_000));
    }

    #[test]
    fn flat_ignores_zone_count() {
        let mut offering = winterization();
        offering.pricing_model = PricingModel::Flat;
        assert_eq!(offering.duration_for(Some(12)), 30);
        assert_eq!(offering.price_for(Some(12)), Cents::new(6_000));
    }

    #[test]
    fn missing_zone_count_defaults_to_one() {
        let offering = winterization();
        assert_eq!(offering.duration_for(None), 35);
    }
}
