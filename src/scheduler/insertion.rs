//! Single-job insertion into an existing day plan.
//!
//! Used by the construction phase of the optimizer and by emergency
//! dispatch. All functions are pure: they scan candidate positions and
//! return what to do, without mutating the routes.

use crate::scheduler::constraints::route_cost;
use crate::scheduler::domain::{SolverInput, UnassignedReason};
use crate::scheduler::travel::TravelTimeEstimator;

/// A feasible placement for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub staff_idx: usize,
    pub position: usize,
    /// Soft-cost increase of the receiving route (lower is better).
    pub soft_delta: i64,
}

/// A placement that requires bumping lower-priority jobs first.
#[derive(Debug, Clone)]
pub struct Displacement {
    pub staff_idx: usize,
    pub position: usize,
    /// Indices of the jobs to move to the waitlist.
    pub bumped: Vec<usize>,
}

/// Find the cheapest feasible position for `job_idx` across all staff.
///
/// A position is feasible when the receiving route gains no hard
/// violations. Returns `None` when no such position exists.
pub fn best_insertion(
    input: &SolverInput,
    routes: &[Vec<usize>],
    job_idx: usize,
    travel: &dyn TravelTimeEstimator,
) -> Option<Insertion> {
    let job = &input.jobs[job_idx];
    let mut best: Option<Insertion> = None;

    for (staff_idx, route) in routes.iter().enumerate() {
        let staff = &input.staff[staff_idx];
        if !staff.has_equipment(&job.equipment_required) {
            continue;
        }

        let (base_hard, base_soft) = route_cost(staff, &input.jobs, route, travel);

        let mut candidate = Vec::with_capacity(route.len() + 1);
        for position in 0..=route.len() {
            candidate.clear();
            candidate.extend_from_slice(&route[..position]);
            candidate.push(job_idx);
            candidate.extend_from_slice(&route[position..]);

            let (hard, soft) = route_cost(staff, &input.jobs, &candidate, travel);
            if hard < base_hard {
                continue;
            }
            let soft_delta = base_soft - soft;
            if best.map_or(true, |b| soft_delta < b.soft_delta) {
                best = Some(Insertion {
                    staff_idx,
                    position,
                    soft_delta,
                });
            }
        }
    }

    best
}

/// Find a placement for `job_idx` by bumping lower-priority jobs.
///
/// Per staff, removable jobs (strictly lower priority, not pinned, single
/// tech) are tried in ascending weight order; the smallest set whose
/// removal admits the job wins. Across staff the minimum-weight candidate
/// is returned: fewest bumped priority points, then fewest jobs.
pub fn displacement_insertion(
    input: &SolverInput,
    routes: &[Vec<usize>],
    job_idx: usize,
    travel: &dyn TravelTimeEstimator,
) -> Option<Displacement> {
    let job = &input.jobs[job_idx];
    let mut best: Option<(u32, usize, Displacement)> = None;

    for (staff_idx, route) in routes.iter().enumerate() {
        let staff = &input.staff[staff_idx];
        if !staff.has_equipment(&job.equipment_required) {
            continue;
        }

        let mut removable: Vec<usize> = route
            .iter()
            .copied()
            .filter(|&i| {
                let other = &input.jobs[i];
                other.priority < job.priority && other.displaceable && other.staff_required <= 1
            })
            .collect();
        if removable.is_empty() {
            continue;
        }
        // Cheapest bumps first; longer jobs free more room at equal priority.
        removable.sort_by(|&a, &b| {
            let ja = &input.jobs[a];
            let jb = &input.jobs[b];
            ja.priority
                .cmp(&jb.priority)
                .then(jb.duration_minutes.cmp(&ja.duration_minutes))
        });

        for k in 1..=removable.len() {
            let bumped: Vec<usize> = removable[..k].to_vec();
            let reduced: Vec<usize> = route
                .iter()
                .copied()
                .filter(|i| !bumped.contains(i))
                .collect();

            let mut reduced_routes = routes.to_vec();
            reduced_routes[staff_idx] = reduced;

            if let Some(insertion) = best_insertion(input, &reduced_routes, job_idx, travel) {
                if insertion.staff_idx != staff_idx {
                    // The reduced route is what made it fit; other staff
                    // are covered by the plain insertion scan already.
                    continue;
                }
                let weight: u32 = bumped
                    .iter()
                    .map(|&i| u32::from(input.jobs[i].priority.value()) + 1)
                    .sum();
                let better = match &best {
                    None => true,
                    Some((w, count, _)) => (weight, bumped.len()) < (*w, *count),
                };
                if better {
                    best = Some((
                        weight,
                        bumped.len(),
                        Displacement {
                            staff_idx,
                            position: insertion.position,
                            bumped,
                        },
                    ));
                }
                break;
            }
        }
    }

    best.map(|(_, _, d)| d)
}

/// Classify why a job cannot be placed, for unassigned reporting.
pub fn classify_unassigned(input: &SolverInput, job_idx: usize) -> UnassignedReason {
    let job = &input.jobs[job_idx];

    if input.staff.is_empty() {
        return UnassignedReason::NoStaff;
    }

    let equipped: Vec<_> = input
        .staff
        .iter()
        .filter(|s| s.has_equipment(&job.equipment_required))
        .collect();
    if equipped.is_empty() || equipped.len() < usize::from(job.staff_required.max(1)) {
        return UnassignedReason::Equipment;
    }

    if equipped
        .iter()
        .all(|s| job.duration_minutes > s.longest_contiguous_minutes())
    {
        return UnassignedReason::Duration;
    }

    if let (Some(ps), Some(pe)) = (job.preferred_start, job.preferred_end) {
        let window = u32::from(pe.saturating_sub(ps));
        let reachable = equipped
            .iter()
            .any(|s| ps < s.window_end && pe > s.window_start);
        if window < job.duration_minutes || !reachable {
            return UnassignedReason::TimeWindow;
        }
    }

    UnassignedReason::Capacity
}
