//! Route optimizer: construction followed by simulated-annealing local
//! search under a wall-clock budget.
//!
//! The solver is pure: it takes an immutable snapshot and returns an
//! immutable solution; persistence happens in the caller. A caller-provided
//! seed makes the output bit-identical for identical input. The returned
//! solution is never lexicographically worse than the construction result.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::scheduler::constraints::{compute_route_slots, evaluate, Score};
use crate::scheduler::domain::{
    PlannedVisit, ScheduleSolution, SolverInput, StaffRoute, UnassignedJob, UnassignedReason,
};
use crate::scheduler::insertion::{best_insertion, classify_unassigned};
use crate::scheduler::travel::TravelTimeEstimator;

/// Bounds for the optimizer budget in seconds.
pub const MIN_BUDGET_SECS: u64 = 5;
pub const MAX_BUDGET_SECS: u64 = 120;
pub const DEFAULT_BUDGET_SECS: u64 = 30;

/// Initial annealing temperature in soft-score units.
const INITIAL_TEMPERATURE: f64 = 40.0;

/// Iteration budget per second of wall-clock budget. The annealing
/// schedule runs on the iteration counter, not the clock, so seeded runs
/// are bit-identical; the wall clock remains a hard stop.
const ITERATIONS_PER_SECOND: u64 = 4_000;

#[derive(Debug, Clone)]
pub struct SolverParams {
    pub time_budget: Duration,
    /// Seeded runs are deterministic; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(DEFAULT_BUDGET_SECS),
            seed: None,
        }
    }
}

impl SolverParams {
    /// Clamp a caller-supplied budget into the allowed range.
    pub fn with_timeout_seconds(timeout_seconds: u64) -> Self {
        Self {
            time_budget: Duration::from_secs(
                timeout_seconds.clamp(MIN_BUDGET_SECS, MAX_BUDGET_SECS),
            ),
            ..Default::default()
        }
    }

    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Produce a day plan for the snapshot.
///
/// `terminate` propagates caller cancellation: the loop finishes its
/// current iteration and returns the best solution found so far.
pub fn solve(
    input: &SolverInput,
    travel: &dyn TravelTimeEstimator,
    params: &SolverParams,
    terminate: Option<Arc<AtomicBool>>,
) -> ScheduleSolution {
    let started = Instant::now();
    let deadline = started + params.time_budget;
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Multi-staff placement pins synchronized starts, so the solver works
    // on its own copy of the job list.
    let mut work = input.clone();

    let (mut routes, reasons) = construct(&mut work, travel);
    let (construction_score, _) = evaluate(&work, &routes, travel);

    let mut best_routes = routes.clone();
    let mut best_score = construction_score;

    let movable: Vec<usize> = (0..work.jobs.len())
        .filter(|&i| !work.jobs[i].is_pinned() && work.jobs[i].staff_required <= 1)
        .collect();

    if !movable.is_empty() && !work.staff.is_empty() {
        let total_iterations =
            params.time_budget.as_secs().max(1) * ITERATIONS_PER_SECOND;
        let mut current_score = construction_score;

        for iteration in 0..total_iterations {
            // Cooperative deadline and cancellation checks every iteration.
            if Instant::now() >= deadline {
                break;
            }
            if let Some(flag) = &terminate {
                if flag.load(Ordering::Relaxed) {
                    break;
                }
            }

            let mut candidate = routes.clone();
            if !propose_move(&mut candidate, &work, &movable, &mut rng) {
                continue;
            }

            let (candidate_score, _) = evaluate(&work, &candidate, travel);
            let fraction = iteration as f64 / total_iterations as f64;
            if accept(candidate_score, current_score, fraction, &mut rng) {
                routes = candidate;
                current_score = candidate_score;
                if current_score.is_better_than(&best_score) {
                    best_routes = routes.clone();
                    best_score = current_score;
                }
            }
        }
    }

    finalize(
        &work,
        best_routes,
        best_score,
        reasons,
        travel,
        started.elapsed(),
    )
}

/// Greedy construction: jobs ordered by (priority desc, preferred start
/// asc, duration desc), each placed at its cheapest feasible position.
fn construct(
    input: &mut SolverInput,
    travel: &dyn TravelTimeEstimator,
) -> (Vec<Vec<usize>>, HashMap<usize, UnassignedReason>) {
    // Pinned visits seed their staff's route in fixed-start order.
    let mut routes = input.seeded_routes();
    let mut reasons = HashMap::new();

    let mut order: Vec<usize> = (0..input.jobs.len())
        .filter(|&i| input.jobs[i].fixed_start.is_none())
        .collect();
    order.sort_by(|&a, &b| {
        let ja = &input.jobs[a];
        let jb = &input.jobs[b];
        jb.priority
            .cmp(&ja.priority)
            .then_with(|| {
                let pa = ja.preferred_start.unwrap_or(u16::MAX);
                let pb = jb.preferred_start.unwrap_or(u16::MAX);
                pa.cmp(&pb)
            })
            .then(jb.duration_minutes.cmp(&ja.duration_minutes))
    });

    for job_idx in order {
        if input.jobs[job_idx].staff_required > 1 {
            if let Some(reason) = place_multi_staff(input, &mut routes, job_idx, travel) {
                reasons.insert(job_idx, reason);
            }
            continue;
        }

        match best_insertion(input, &routes, job_idx, travel) {
            Some(insertion) => {
                routes[insertion.staff_idx].insert(insertion.position, job_idx);
            }
            None => {
                reasons.insert(job_idx, classify_unassigned(input, job_idx));
            }
        }
    }

    (routes, reasons)
}

/// Place a job needing N techs: append to the N equipped staff with the
/// earliest common start and pin that start so the co-assignments stay
/// synchronized. Returns the failure reason when it cannot be placed.
fn place_multi_staff(
    input: &mut SolverInput,
    routes: &mut [Vec<usize>],
    job_idx: usize,
    travel: &dyn TravelTimeEstimator,
) -> Option<UnassignedReason> {
    let required = usize::from(input.jobs[job_idx].staff_required);

    if input.staff.is_empty() {
        return Some(UnassignedReason::NoStaff);
    }

    let mut starts: Vec<(usize, u16)> = Vec::new();
    for (staff_idx, staff) in input.staff.iter().enumerate() {
        if !staff.has_equipment(&input.jobs[job_idx].equipment_required) {
            continue;
        }
        let mut trial = routes[staff_idx].clone();
        trial.push(job_idx);
        let slots = compute_route_slots(staff, &input.jobs, &trial, travel);
        if let Some(last) = slots.last() {
            starts.push((staff_idx, last.start));
        }
    }

    if starts.len() < required {
        return Some(UnassignedReason::Equipment);
    }

    starts.sort_by_key(|&(_, start)| start);
    let chosen = &starts[..required];
    let sync_start = chosen.iter().map(|&(_, s)| s).max().expect("non-empty");

    input.jobs[job_idx].fixed_start = Some(sync_start);
    let before: Vec<Vec<usize>> = chosen
        .iter()
        .map(|&(staff_idx, _)| routes[staff_idx].clone())
        .collect();
    for &(staff_idx, _) in chosen {
        routes[staff_idx].push(job_idx);
    }

    // Verify the synchronized placement adds no hard violation; the later
    // staff may only reach the common start via waiting, never early.
    let (score, _) = evaluate(input, routes, travel);
    if score.hard < 0 {
        for (restore, &(staff_idx, _)) in before.into_iter().zip(chosen) {
            routes[staff_idx] = restore;
        }
        input.jobs[job_idx].fixed_start = None;
        return Some(UnassignedReason::Capacity);
    }

    None
}

/// Apply one random neighborhood move. Returns false when the pick was a
/// no-op (the annealing loop just draws again).
fn propose_move(
    routes: &mut [Vec<usize>],
    input: &SolverInput,
    movable: &[usize],
    rng: &mut StdRng,
) -> bool {
    match rng.gen_range(0..3u8) {
        0 => relocate_move(routes, movable, rng),
        1 => swap_move(routes, input, rng),
        _ => two_opt_move(routes, input, rng),
    }
}

/// Move one job (assigned or unassigned) to a random position on a random
/// staff. Inserting an unassigned job is how the search recovers coverage.
fn relocate_move(routes: &mut [Vec<usize>], movable: &[usize], rng: &mut StdRng) -> bool {
    if movable.is_empty() || routes.is_empty() {
        return false;
    }
    let job_idx = movable[rng.gen_range(0..movable.len())];

    for route in routes.iter_mut() {
        if let Some(pos) = route.iter().position(|&i| i == job_idx) {
            route.remove(pos);
            break;
        }
    }

    let target = rng.gen_range(0..routes.len());
    let position = rng.gen_range(0..=routes[target].len());
    routes[target].insert(position, job_idx);
    true
}

/// Swap two movable jobs between (or within) routes.
fn swap_move(routes: &mut [Vec<usize>], input: &SolverInput, rng: &mut StdRng) -> bool {
    let positions: Vec<(usize, usize)> = routes
        .iter()
        .enumerate()
        .flat_map(|(s, route)| {
            route
                .iter()
                .enumerate()
                .filter(|&(_, &j)| !input.jobs[j].is_pinned())
                .map(move |(p, _)| (s, p))
        })
        .collect();
    if positions.len() < 2 {
        return false;
    }
    let a = positions[rng.gen_range(0..positions.len())];
    let b = positions[rng.gen_range(0..positions.len())];
    if a == b {
        return false;
    }
    let job_a = routes[a.0][a.1];
    let job_b = routes[b.0][b.1];
    routes[a.0][a.1] = job_b;
    routes[b.0][b.1] = job_a;
    true
}

/// Reverse a random segment within one staff's route.
fn two_opt_move(routes: &mut [Vec<usize>], input: &SolverInput, rng: &mut StdRng) -> bool {
    let eligible: Vec<usize> = routes
        .iter()
        .enumerate()
        .filter(|(_, r)| r.len() >= 2)
        .map(|(s, _)| s)
        .collect();
    if eligible.is_empty() {
        return false;
    }
    let staff_idx = eligible[rng.gen_range(0..eligible.len())];
    let len = routes[staff_idx].len();
    let i = rng.gen_range(0..len - 1);
    let j = rng.gen_range(i + 1..len);
    if routes[staff_idx][i..=j]
        .iter()
        .any(|&job| input.jobs[job].is_pinned())
    {
        return false;
    }
    routes[staff_idx][i..=j].reverse();
    true
}

/// Annealing acceptance: lexicographic improvements always pass; a
/// soft-only regression passes with probability decaying over the run.
fn accept(candidate: Score, current: Score, fraction: f64, rng: &mut StdRng) -> bool {
    if (candidate.hard, candidate.soft) >= (current.hard, current.soft) {
        return true;
    }
    if candidate.hard < current.hard {
        return false;
    }
    let delta = (candidate.soft - current.soft) as f64; // negative
    let temperature = INITIAL_TEMPERATURE * (1.0 - fraction.min(1.0)) + 0.01;
    rng.gen::<f64>() < (delta / temperature).exp()
}

fn finalize(
    input: &SolverInput,
    routes: Vec<Vec<usize>>,
    score: Score,
    reasons: HashMap<usize, UnassignedReason>,
    travel: &dyn TravelTimeEstimator,
    elapsed: Duration,
) -> ScheduleSolution {
    // Recompute exact slots for the winning routes.
    let mut staff_routes = Vec::with_capacity(input.staff.len());
    let mut assigned = vec![false; input.jobs.len()];

    for (staff_idx, route) in routes.iter().enumerate() {
        let staff = &input.staff[staff_idx];
        let slots = compute_route_slots(staff, &input.jobs, route, travel);
        let mut visits = Vec::with_capacity(slots.len());
        let mut total_travel = 0;
        for (sequence_index, slot) in slots.iter().enumerate() {
            let job = &input.jobs[slot.job_idx];
            assigned[slot.job_idx] = true;
            total_travel += slot.travel_minutes;
            visits.push(PlannedVisit {
                job_id: job.id,
                customer_name: job.customer_name.clone(),
                service_name: job.service_name.clone(),
                start: slot.start,
                end: slot.end,
                duration_minutes: job.duration_minutes,
                travel_minutes: slot.travel_minutes,
                sequence_index,
            });
        }
        staff_routes.push(StaffRoute {
            staff_id: staff.id,
            staff_name: staff.name.clone(),
            visits,
            total_travel_minutes: total_travel,
        });
    }

    let unassigned = input
        .jobs
        .iter()
        .enumerate()
        .filter(|&(idx, _)| !assigned[idx])
        .map(|(idx, job)| UnassignedJob {
            job_id: job.id,
            customer_name: job.customer_name.clone(),
            service_name: job.service_name.clone(),
            reason: reasons
                .get(&idx)
                .copied()
                .unwrap_or_else(|| classify_unassigned(input, idx)),
        })
        .collect();

    ScheduleSolution {
        schedule_date: input.date,
        routes: staff_routes,
        unassigned,
        hard_score: score.hard,
        soft_score: score.soft,
        elapsed_seconds: elapsed.as_secs_f64(),
    }
}
