//! Property-style tests over the solver and the schema helpers.

use chrono::NaiveDate;
use proptest::prelude::*;
use std::time::Duration;

use fieldops_rust::api::{GeoPoint, JobId, StaffId};
use fieldops_rust::models::contact::{normalize_phone, validate_zip};
use fieldops_rust::models::{JobCategory, JobPriority};
use fieldops_rust::scheduler::domain::{SolverInput, SolverJob, SolverStaff};
use fieldops_rust::scheduler::solver::{solve, SolverParams};
use fieldops_rust::scheduler::travel::GreatCircleEstimator;

fn arb_job() -> impl Strategy<Value = SolverJob> {
    (
        30u32..180,
        0u8..=1,
        (4470i32..4520, -9350i32..-9300),
        prop::bool::ANY,
    )
        .prop_map(|(duration, priority, (lat, lng), compressor)| SolverJob {
            id: JobId::new(),
            customer_name: "Customer".to_string(),
            service_name: "Service".to_string(),
            category: JobCategory::Seasonal,
            location: GeoPoint {
                latitude: lat as f64 / 100.0,
                longitude: lng as f64 / 100.0,
            },
            city: None,
            duration_minutes: duration,
            buffer_minutes: 10,
            equipment_required: if compressor {
                vec!["compressor".to_string()]
            } else {
                vec![]
            },
            priority: JobPriority::new(priority),
            preferred_start: None,
            preferred_end: None,
            staff_required: 1,
            fixed_start: None,
            fixed_staff: None,
            displaceable: true,
        })
}

fn arb_staff() -> impl Strategy<Value = SolverStaff> {
    ((4470i32..4520, -9350i32..-9300), prop::bool::ANY).prop_map(
        |((lat, lng), compressor)| SolverStaff {
            id: StaffId::new(),
            name: "Tech".to_string(),
            start_location: GeoPoint {
                latitude: lat as f64 / 100.0,
                longitude: lng as f64 / 100.0,
            },
            equipment: if compressor {
                vec!["compressor".to_string()]
            } else {
                vec![]
            },
            window_start: 8 * 60,
            window_end: 17 * 60,
            lunch_start: Some(12 * 60),
            lunch_minutes: 30,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every produced solution conserves the job set: assigned plus
    /// unassigned equals the input, disjointly.
    #[test]
    fn solver_conserves_jobs(
        jobs in prop::collection::vec(arb_job(), 0..8),
        staff in prop::collection::vec(arb_staff(), 0..3),
    ) {
        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            jobs,
            staff,
        };
        let travel = GreatCircleEstimator::default();
        let params = SolverParams {
            time_budget: Duration::from_secs(1),
            seed: Some(7),
        };
        let solution = solve(&input, &travel, &params, None);

        let assigned: std::collections::HashSet<_> = solution
            .routes
            .iter()
            .flat_map(|r| r.visits.iter().map(|v| v.job_id))
            .collect();
        let unassigned: std::collections::HashSet<_> =
            solution.unassigned.iter().map(|u| u.job_id).collect();

        prop_assert!(assigned.is_disjoint(&unassigned));
        prop_assert_eq!(assigned.len() + unassigned.len(), input.jobs.len());
    }

    /// Feasible solutions keep every visit inside the working window and
    /// clear of lunch.
    #[test]
    fn feasible_solutions_respect_windows(
        jobs in prop::collection::vec(arb_job(), 1..6),
        staff in prop::collection::vec(arb_staff(), 1..3),
    ) {
        let input = SolverInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
            jobs,
            staff,
        };
        let travel = GreatCircleEstimator::default();
        let params = SolverParams {
            time_budget: Duration::from_secs(1),
            seed: Some(11),
        };
        let solution = solve(&input, &travel, &params, None);

        if solution.is_feasible() {
            for route in &solution.routes {
                for visit in &route.visits {
                    prop_assert!(visit.start >= 8 * 60);
                    prop_assert!(visit.end <= 17 * 60);
                    prop_assert!(visit.end <= 12 * 60 || visit.start >= 12 * 60 + 30);
                }
            }
        }
    }

    /// Phone normalization is a fixed point on its own output.
    #[test]
    fn phone_normalization_is_idempotent(raw in "[0-9 ()+.-]{0,16}") {
        let once = normalize_phone(&raw);
        prop_assert_eq!(normalize_phone(&once), once);
    }

    /// Zip validation accepts exactly the 5 and 5+4 digit shapes.
    #[test]
    fn zip_validation_shapes(zip in "[0-9]{5}") {
        let zip_plus4 = format!("{}-1234", zip);
        let zip_plus_extra_digit = format!("{}9", zip);
        prop_assert!(validate_zip(&zip));
        prop_assert!(validate_zip(&zip_plus4));
        prop_assert!(!validate_zip(&zip_plus_extra_digit));
    }
}
