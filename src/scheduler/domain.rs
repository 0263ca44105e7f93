//! Solver snapshot types.
//!
//! The optimizer works on an immutable [`SolverInput`] built by the
//! service layer from the day's jobs and staff. Time is minutes since
//! midnight (`Minute`); routes are per-staff ordered lists of job indices
//! into `SolverInput::jobs`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::api::{GeoPoint, JobId, StaffId};
use crate::models::{JobCategory, JobPriority};

/// Minutes since midnight.
pub type Minute = u16;

pub fn time_to_minutes(t: NaiveTime) -> Minute {
    use chrono::Timelike;
    (t.hour() * 60 + t.minute()) as Minute
}

pub fn minutes_to_time(m: Minute) -> NaiveTime {
    NaiveTime::from_hms_opt(u32::from(m) / 60, u32::from(m) % 60, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// A job in the solver snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverJob {
    pub id: JobId,
    pub customer_name: String,
    pub service_name: String,
    pub category: JobCategory,
    pub location: GeoPoint,
    pub city: Option<String>,
    pub duration_minutes: u32,
    pub buffer_minutes: u32,
    pub equipment_required: Vec<String>,
    pub priority: JobPriority,
    pub preferred_start: Option<Minute>,
    pub preferred_end: Option<Minute>,
    /// Techs that must be on site simultaneously.
    pub staff_required: u8,
    /// Set for pinned visits (confirmed appointments during re-optimize,
    /// the anchor of an emergency insert). A pinned job cannot move and
    /// must start exactly here.
    pub fixed_start: Option<Minute>,
    /// Staff index a pinned visit belongs to.
    pub fixed_staff: Option<usize>,
    /// Whether emergency dispatch may bump this job to the waitlist.
    /// False for confirmed or started appointments.
    pub displaceable: bool,
}

impl SolverJob {
    /// Service time plus buffer.
    pub fn total_minutes(&self) -> u32 {
        self.duration_minutes + self.buffer_minutes
    }

    pub fn is_pinned(&self) -> bool {
        self.fixed_start.is_some()
    }
}

/// A staff member in the solver snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverStaff {
    pub id: StaffId,
    pub name: String,
    pub start_location: GeoPoint,
    pub equipment: Vec<String>,
    pub window_start: Minute,
    pub window_end: Minute,
    pub lunch_start: Option<Minute>,
    pub lunch_minutes: u16,
}

impl SolverStaff {
    pub fn has_equipment(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|eq| self.equipment.iter().any(|have| have == eq))
    }

    pub fn lunch_end(&self) -> Option<Minute> {
        self.lunch_start.map(|s| s + self.lunch_minutes)
    }

    /// Working minutes net of lunch.
    pub fn working_minutes(&self) -> u32 {
        let total = u32::from(self.window_end.saturating_sub(self.window_start));
        total.saturating_sub(if self.lunch_start.is_some() {
            u32::from(self.lunch_minutes)
        } else {
            0
        })
    }

    /// Longest contiguous stretch inside the window (the larger of the
    /// before-lunch and after-lunch segments).
    pub fn longest_contiguous_minutes(&self) -> u32 {
        match (self.lunch_start, self.lunch_end()) {
            (Some(ls), Some(le)) if ls > self.window_start && le < self.window_end => {
                let before = u32::from(ls - self.window_start);
                let after = u32::from(self.window_end - le);
                before.max(after)
            }
            _ => u32::from(self.window_end.saturating_sub(self.window_start)),
        }
    }
}

/// Immutable input snapshot for one date.
#[derive(Debug, Clone)]
pub struct SolverInput {
    pub date: NaiveDate,
    pub jobs: Vec<SolverJob>,
    pub staff: Vec<SolverStaff>,
}

impl SolverInput {
    /// Per-staff routes seeded with the pinned visits in fixed-start order.
    pub fn seeded_routes(&self) -> Vec<Vec<usize>> {
        let mut routes: Vec<Vec<usize>> = vec![Vec::new(); self.staff.len()];
        for (idx, job) in self.jobs.iter().enumerate() {
            if let (Some(_), Some(staff_idx)) = (job.fixed_start, job.fixed_staff) {
                if staff_idx < routes.len() {
                    routes[staff_idx].push(idx);
                }
            }
        }
        for route in &mut routes {
            route.sort_by_key(|&i| self.jobs[i].fixed_start);
        }
        routes
    }
}

/// Why a job could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// No staff available on the date.
    NoStaff,
    /// No available staff carries the required equipment.
    Equipment,
    /// Duration exceeds every staff's longest contiguous stretch.
    Duration,
    /// The preferred window cannot be satisfied.
    TimeWindow,
    /// Feasible in isolation but no capacity remained.
    Capacity,
}

impl UnassignedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnassignedReason::NoStaff => "no_staff",
            UnassignedReason::Equipment => "equipment",
            UnassignedReason::Duration => "duration",
            UnassignedReason::TimeWindow => "time_window",
            UnassignedReason::Capacity => "capacity",
        }
    }
}

impl std::fmt::Display for UnassignedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planned visit in the solution, slots already computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedVisit {
    pub job_id: JobId,
    pub customer_name: String,
    pub service_name: String,
    pub start: Minute,
    pub end: Minute,
    pub duration_minutes: u32,
    pub travel_minutes: u32,
    pub sequence_index: usize,
}

/// One staff's ordered day plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRoute {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub visits: Vec<PlannedVisit>,
    pub total_travel_minutes: u32,
}

/// A job left out of the plan, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnassignedJob {
    pub job_id: JobId,
    pub customer_name: String,
    pub service_name: String,
    pub reason: UnassignedReason,
}

/// The complete solver output for a date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSolution {
    pub schedule_date: NaiveDate,
    pub routes: Vec<StaffRoute>,
    pub unassigned: Vec<UnassignedJob>,
    pub hard_score: i64,
    pub soft_score: i64,
    pub elapsed_seconds: f64,
}

impl ScheduleSolution {
    /// All hard constraints satisfied.
    pub fn is_feasible(&self) -> bool {
        self.hard_score == 0
    }

    pub fn assigned_count(&self) -> usize {
        // Multi-staff jobs appear on several routes; count distinct jobs.
        let mut seen = std::collections::HashSet::new();
        for route in &self.routes {
            for visit in &route.visits {
                seen.insert(visit.job_id);
            }
        }
        seen.len()
    }

    pub fn total_travel_minutes(&self) -> u32 {
        self.routes.iter().map(|r| r.total_travel_minutes).sum()
    }

    pub fn score_str(&self) -> String {
        format!("[{}hard/{}soft]", self.hard_score, self.soft_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_conversions() {
        let t = NaiveTime::from_hms_opt(13, 45, 0).unwrap();
        assert_eq!(time_to_minutes(t), 825);
        assert_eq!(minutes_to_time(825), t);
    }

    #[test]
    fn longest_contiguous_respects_lunch() {
        let staff = SolverStaff {
            id: StaffId::new(),
            name: "A".to_string(),
            start_location: GeoPoint {
                latitude: 44.98,
                longitude: -93.26,
            },
            equipment: vec![],
            window_start: 8 * 60,
            window_end: 17 * 60,
            lunch_start: Some(12 * 60),
            lunch_minutes: 30,
        };
        // Before lunch: 240 min, after lunch: 270 min.
        assert_eq!(staff.longest_contiguous_minutes(), 270);
        assert_eq!(staff.working_minutes(), 9 * 60 - 30);
    }

    #[test]
    fn no_lunch_means_whole_window() {
        let staff = SolverStaff {
            id: StaffId::new(),
            name: "B".to_string(),
            start_location: GeoPoint {
                latitude: 44.98,
                longitude: -93.26,
            },
            equipment: vec![],
            window_start: 9 * 60,
            window_end: 15 * 60,
            lunch_start: None,
            lunch_minutes: 0,
        };
        assert_eq!(staff.longest_contiguous_minutes(), 360);
    }
}
