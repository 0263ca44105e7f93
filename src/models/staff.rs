//! Staff and per-date availability records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{GeoPoint, StaffId};

use super::enums::StaffRole;

/// A worker. Only staff with role `tech` are considered by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub skill_level: i16,
    pub certifications: Vec<String>,
    /// Equipment carried on the truck; jobs require a subset of this.
    pub assigned_equipment: Vec<String>,
    /// Where the day's route starts (shop or home).
    pub start_location: Option<GeoPoint>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Staff {
    /// Check if this staff carries all required equipment.
    pub fn has_equipment(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|eq| self.assigned_equipment.iter().any(|have| have == eq))
    }

    /// Equipment items required by a job but missing from this staff.
    pub fn missing_equipment(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|eq| !self.assigned_equipment.iter().any(|have| have == *eq))
            .cloned()
            .collect()
    }
}

/// Maximum lunch duration in minutes.
pub const MAX_LUNCH_MINUTES: u16 = 120;

/// One row per (staff, date): the working window and lunch interval.
///
/// The lunch interval is forbidden time inside the window; slot
/// computation pushes work past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAvailability {
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub lunch_start: Option<NaiveTime>,
    pub lunch_duration_minutes: u16,
    pub is_available: bool,
}

impl StaffAvailability {
    pub fn standard_day(staff_id: StaffId, date: NaiveDate) -> Self {
        Self {
            staff_id,
            date,
            window_start: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            window_end: NaiveTime::from_hms_opt(17, 0, 0).expect("valid time"),
            lunch_start: Some(NaiveTime::from_hms_opt(12, 0, 0).expect("valid time")),
            lunch_duration_minutes: 30,
            is_available: true,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.window_end <= self.window_start {
            return Err("availability window end must be after start".to_string());
        }
        if self.lunch_duration_minutes > MAX_LUNCH_MINUTES {
            return Err(format!(
                "lunch duration {} exceeds {} minutes",
                self.lunch_duration_minutes, MAX_LUNCH_MINUTES
            ));
        }
        Ok(())
    }

    /// Total working minutes, net of lunch.
    pub fn working_minutes(&self) -> u32 {
        let total = (self.window_end - self.window_start).num_minutes().max(0) as u32;
        let lunch = if self.lunch_start.is_some() {
            self.lunch_duration_minutes as u32
        } else {
            0
        };
        total.saturating_sub(lunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equipment_subset_check() {
        let mut staff = Staff {
            id: StaffId::new(),
            name: "A".to_string(),
            role: StaffRole::Tech,
            skill_level: 2,
            certifications: vec![],
            assigned_equipment: vec!["compressor".to_string(), "trencher".to_string()],
            start_location: None,
            email: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(staff.has_equipment(&["compressor".to_string()]));
        assert!(staff.has_equipment(&[]));
        assert!(!staff.has_equipment(&["backhoe".to_string()]));
        assert_eq!(staff.missing_equipment(&["backhoe".to_string()]), vec!["backhoe"]);

        staff.assigned_equipment.clear();
        assert!(staff.has_equipment(&[]));
    }

    #[test]
    fn working_minutes_excludes_lunch() {
        let avail = StaffAvailability::standard_day(
            StaffId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
        );
        // 08:00-17:00 minus 30 minute lunch
        assert_eq!(avail.working_minutes(), 9 * 60 - 30);
    }

    #[test]
    fn rejects_inverted_window_and_long_lunch() {
        let mut avail = StaffAvailability::standard_day(
            StaffId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
        );
        assert!(avail.validate().is_ok());

        avail.lunch_duration_minutes = 121;
        assert!(avail.validate().is_err());

        avail.lunch_duration_minutes = 30;
        avail.window_end = avail.window_start;
        assert!(avail.validate().is_err());
    }
}
