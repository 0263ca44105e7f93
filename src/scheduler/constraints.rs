//! Constraint evaluation over a candidate day plan.
//!
//! Stateless: takes the snapshot, the per-staff routes, and the travel
//! oracle, and returns a `(hard, soft)` score plus the computed time
//! slots. Both scores are `<= 0`; `hard == 0` means feasible and soft is
//! maximized subject to that.

use std::collections::HashMap;

use crate::scheduler::domain::{Minute, SolverInput, SolverJob, SolverStaff};
use crate::scheduler::travel::TravelTimeEstimator;

pub const WEIGHT_TRAVEL: i64 = 1;
pub const WEIGHT_CITY_TRANSITION: i64 = 5;
pub const WEIGHT_TYPE_TRANSITION: i64 = 3;
pub const WEIGHT_UNASSIGNED: i64 = 1000;
pub const WEIGHT_LATE_URGENT: i64 = 2;
pub const WEIGHT_WINDOW_MISS: i64 = 2;

const NOON: Minute = 12 * 60;

/// Lexicographic (hard, soft) score. Zero is best on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Score {
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0, soft: 0 };

    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    /// Lexicographic comparison: hard first, then soft.
    pub fn is_better_than(&self, other: &Score) -> bool {
        (self.hard, self.soft) > (other.hard, other.soft)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}hard/{}soft]", self.hard, self.soft)
    }
}

/// Computed slot for one job within a route.
#[derive(Debug, Clone, Copy)]
pub struct Slot {
    pub job_idx: usize,
    pub start: Minute,
    pub end: Minute,
    pub travel_minutes: u32,
}

/// Walk a route from the staff's start location, computing time slots:
/// travel, then service, then buffer. Arriving early waits for the job's
/// preferred start; a slot that would cross lunch is pushed past it.
/// Pinned jobs start at their fixed minute when reachable.
pub fn compute_route_slots(
    staff: &SolverStaff,
    jobs: &[SolverJob],
    route: &[usize],
    travel: &dyn TravelTimeEstimator,
) -> Vec<Slot> {
    let mut slots = Vec::with_capacity(route.len());
    let mut cursor = staff.window_start;
    let mut location = staff.start_location;

    for &job_idx in route {
        let job = &jobs[job_idx];
        let travel_minutes = travel.estimate(location, job.location);
        let mut start = cursor.saturating_add(travel_minutes as Minute);

        if let Some(preferred) = job.preferred_start {
            if job.fixed_start.is_none() && start < preferred {
                start = preferred;
            }
        }

        // Push past the lunch interval when the service would cross it.
        if let (Some(lunch_start), Some(lunch_end)) = (staff.lunch_start, staff.lunch_end()) {
            let end = start.saturating_add(job.duration_minutes as Minute);
            if job.fixed_start.is_none() && start < lunch_end && end > lunch_start {
                start = lunch_end;
            }
        }

        if let Some(fixed) = job.fixed_start {
            // A pinned visit waits for its fixed minute; arriving later
            // than it is a conflict the evaluator flags.
            if start < fixed {
                start = fixed;
            }
        }

        let end = start.saturating_add(job.duration_minutes as Minute);
        slots.push(Slot {
            job_idx,
            start,
            end,
            travel_minutes,
        });

        cursor = end.saturating_add(job.buffer_minutes as Minute);
        location = job.location;
    }

    slots
}

/// Hard violations within one staff's route. Each violation counts -1.
fn route_hard(staff: &SolverStaff, jobs: &[SolverJob], slots: &[Slot]) -> i64 {
    let mut hard = 0;

    for slot in slots {
        let job = &jobs[slot.job_idx];

        if !staff.has_equipment(&job.equipment_required) {
            hard -= 1;
        }

        if slot.start < staff.window_start || slot.end > staff.window_end {
            hard -= 1;
        }

        if let (Some(lunch_start), Some(lunch_end)) = (staff.lunch_start, staff.lunch_end()) {
            if slot.start < lunch_end && slot.end > lunch_start {
                hard -= 1;
            }
        }

        if let Some(fixed) = job.fixed_start {
            if slot.start != fixed {
                hard -= 1;
            }
        }

        if job.priority.is_urgent() {
            if !window_contains(job, slot) {
                hard -= 1;
            }
        }
    }

    hard
}

fn window_contains(job: &SolverJob, slot: &Slot) -> bool {
    match (job.preferred_start, job.preferred_end) {
        (Some(ps), Some(pe)) => slot.start >= ps && slot.end <= pe,
        (Some(ps), None) => slot.start >= ps,
        (None, Some(pe)) => slot.end <= pe,
        (None, None) => true,
    }
}

/// Soft cost of one staff's route (all terms negative).
fn route_soft(jobs: &[SolverJob], route: &[usize], slots: &[Slot]) -> i64 {
    let mut soft = 0;

    for slot in slots {
        let job = &jobs[slot.job_idx];
        soft -= WEIGHT_TRAVEL * slot.travel_minutes as i64;

        if job.priority.is_urgent() && slot.start > NOON {
            let past_noon = (slot.start - NOON) as i64;
            soft -= WEIGHT_LATE_URGENT * ((past_noon + 29) / 30);
        }

        if !job.priority.is_urgent() && !window_contains(job, slot) {
            soft -= WEIGHT_WINDOW_MISS;
        }
    }

    for pair in route.windows(2) {
        let (a, b) = (&jobs[pair[0]], &jobs[pair[1]]);
        if let (Some(ca), Some(cb)) = (&a.city, &b.city) {
            if ca != cb {
                soft -= WEIGHT_CITY_TRANSITION;
            }
        }
        if a.category != b.category {
            soft -= WEIGHT_TYPE_TRANSITION;
        }
    }

    soft
}

/// Hard and soft cost of a single staff's route in isolation.
///
/// Used by insertion scans: a single-tech job placement only perturbs one
/// route, so candidate positions can be compared on this local cost.
pub fn route_cost(
    staff: &SolverStaff,
    jobs: &[SolverJob],
    route: &[usize],
    travel: &dyn TravelTimeEstimator,
) -> (i64, i64) {
    let slots = compute_route_slots(staff, jobs, route, travel);
    (route_hard(staff, jobs, &slots), route_soft(jobs, route, &slots))
}

/// Evaluate a full candidate plan.
///
/// Returns the lexicographic score and the computed per-staff slots.
/// Cross-route checks: multi-staff jobs must be co-assigned on exactly
/// `staff_required` distinct staff with synchronized starts; every job
/// missing from all routes contributes the unassigned penalty.
pub fn evaluate(
    input: &SolverInput,
    routes: &[Vec<usize>],
    travel: &dyn TravelTimeEstimator,
) -> (Score, Vec<Vec<Slot>>) {
    let mut hard = 0;
    let mut soft = 0;
    let mut all_slots = Vec::with_capacity(routes.len());

    // (assignment count, first start) per job for the co-assignment check.
    let mut assignments: HashMap<usize, Vec<Minute>> = HashMap::new();

    for (staff_idx, route) in routes.iter().enumerate() {
        let staff = &input.staff[staff_idx];
        let slots = compute_route_slots(staff, &input.jobs, route, travel);

        hard += route_hard(staff, &input.jobs, &slots);
        soft += route_soft(&input.jobs, route, &slots);

        for slot in &slots {
            assignments.entry(slot.job_idx).or_default().push(slot.start);
        }
        all_slots.push(slots);
    }

    for (job_idx, job) in input.jobs.iter().enumerate() {
        match assignments.get(&job_idx) {
            None => soft -= WEIGHT_UNASSIGNED,
            Some(starts) => {
                let required = usize::from(job.staff_required.max(1));
                if starts.len() != required {
                    hard -= 1;
                } else if required > 1 && starts.windows(2).any(|w| w[0] != w[1]) {
                    hard -= 1;
                }
            }
        }
    }

    (Score { hard, soft }, all_slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GeoPoint, JobId, StaffId};
    use crate::models::{JobCategory, JobPriority};
    use crate::scheduler::travel::GreatCircleEstimator;
    use chrono::NaiveDate;

    fn point(lat: f64) -> GeoPoint {
        GeoPoint {
            latitude: lat,
            longitude: -93.26,
        }
    }

    fn job(duration: u32) -> SolverJob {
        SolverJob {
            id: JobId::new(),
            customer_name: "C".to_string(),
            service_name: "Winterization".to_string(),
            category: JobCategory::Seasonal,
            location: point(44.99),
            city: Some("Minneapolis".to_string()),
            duration_minutes: duration,
            buffer_minutes: 10,
            equipment_required: vec![],
            priority: JobPriority::NORMAL,
            preferred_start: None,
            preferred_end: None,
            staff_required: 1,
            fixed_start: None,
            fixed_staff: None,
            displaceable: true,
        }
    }

    fn staff() -> SolverStaff {
        SolverStaff {
            id: StaffId::new(),
            name: "A".to_string(),
            start_location: point(44.98),
            equipment: vec![],
            window_start: 8 * 60,
            window_end: 17 * 60,
            lunch_start: Some(12 * 60),
            lunch_minutes: 30,
        }
    }

    fn input(jobs: Vec<SolverJob>, staff_list: Vec<SolverStaff>) -> SolverInput {
        SolverInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            jobs,
            staff: staff_list,
        }
    }

    #[test]
    fn slots_walk_travel_service_buffer() {
        let travel = GreatCircleEstimator::default();
        let input = input(vec![job(60), job(60)], vec![staff()]);
        let slots = compute_route_slots(&input.staff[0], &input.jobs, &[0, 1], &travel);

        assert_eq!(slots.len(), 2);
        // First: 08:00 + travel floor (5) = 08:05, ends 09:05.
        assert_eq!(slots[0].start, 8 * 60 + 5);
        assert_eq!(slots[0].end, 9 * 60 + 5);
        // Second: 09:05 + 10 buffer + 0 travel (same site) = 09:15.
        assert_eq!(slots[1].start, 9 * 60 + 15);
    }

    #[test]
    fn lunch_pushes_crossing_slot() {
        let travel = GreatCircleEstimator::default();
        let mut first = job(225); // 08:05 + 225 = 11:50
        first.buffer_minutes = 0;
        let second = job(60); // would start 11:50+5 travel... same site so 11:50, crosses lunch
        let input = input(vec![first, second], vec![staff()]);
        let slots = compute_route_slots(&input.staff[0], &input.jobs, &[0, 1], &travel);

        // Second slot must start at lunch end.
        assert_eq!(slots[1].start, 12 * 60 + 30);
        let (score, _) = evaluate(&input, &[vec![0, 1]], &travel);
        assert_eq!(score.hard, 0);
    }

    #[test]
    fn equipment_mismatch_is_hard() {
        let travel = GreatCircleEstimator::default();
        let mut j = job(60);
        j.equipment_required = vec!["compressor".to_string()];
        let input = input(vec![j], vec![staff()]);
        let (score, _) = evaluate(&input, &[vec![0]], &travel);
        assert_eq!(score.hard, -1);
    }

    #[test]
    fn overflow_past_window_is_hard() {
        let travel = GreatCircleEstimator::default();
        // 10 hours of work cannot fit an 8:00-17:00 day.
        let input = input(vec![job(600)], vec![staff()]);
        let (score, _) = evaluate(&input, &[vec![0]], &travel);
        assert!(score.hard < 0);
    }

    #[test]
    fn unassigned_jobs_cost_soft() {
        let travel = GreatCircleEstimator::default();
        let input = input(vec![job(60), job(60)], vec![staff()]);
        let (score, _) = evaluate(&input, &[vec![0]], &travel);
        assert_eq!(score.hard, 0);
        assert!(score.soft <= -WEIGHT_UNASSIGNED);
    }

    #[test]
    fn urgent_window_miss_is_hard() {
        let travel = GreatCircleEstimator::default();
        let mut j = job(60);
        j.priority = JobPriority::URGENT;
        j.preferred_start = Some(14 * 60);
        j.preferred_end = Some(15 * 60);
        // Waiting rule means the slot lands inside the window.
        let input = input(vec![j], vec![staff()]);
        let (score, slots) = evaluate(&input, &[vec![0]], &travel);
        assert_eq!(slots[0][0].start, 14 * 60);
        assert_eq!(score.hard, 0);

        // Now make the window impossible: ends before it can start.
        let mut j2 = job(60);
        j2.priority = JobPriority::URGENT;
        j2.preferred_end = Some(8 * 60);
        let input2 = input2_helper(j2);
        let (score2, _) = evaluate(&input2, &[vec![0]], &travel);
        assert_eq!(score2.hard, -1);
    }

    fn input2_helper(j: SolverJob) -> SolverInput {
        SolverInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            jobs: vec![j],
            staff: vec![staff()],
        }
    }

    #[test]
    fn partial_multi_staff_assignment_is_hard() {
        let travel = GreatCircleEstimator::default();
        let mut j = job(60);
        j.staff_required = 2;
        let input = input(vec![j], vec![staff(), staff()]);
        // Only one of the two required co-assignments present.
        let (score, _) = evaluate(&input, &[vec![0], vec![]], &travel);
        assert_eq!(score.hard, -1);
    }

    #[test]
    fn city_transitions_cost_soft() {
        let travel = GreatCircleEstimator::default();
        let mut a = job(30);
        let mut b = job(30);
        b.city = Some("Edina".to_string());
        let mut c = job(30);
        c.city = Some("Edina".to_string());
        a.buffer_minutes = 0;
        b.buffer_minutes = 0;
        c.buffer_minutes = 0;

        let input_mixed = input(vec![a.clone(), b.clone(), c.clone()], vec![staff()]);
        let (mixed, _) = evaluate(&input_mixed, &[vec![0, 1, 2]], &travel);
        let (batched, _) = evaluate(&input_mixed, &[vec![1, 2, 0]], &travel);
        // One transition either way here, but batching Edina together
        // never does worse.
        assert!(batched.soft >= mixed.soft);
    }
}
