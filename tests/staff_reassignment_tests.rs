//! Staff removal and redistribution scenarios.

mod support;

use fieldops_rust::models::{AppointmentStatus, JobStatus};
use support::{test_date, TestWorld};

/// Mid-day removal: mark unavailable cancels the staff's appointments,
/// and reassignment moves the freed jobs onto the covering tech.
#[tokio::test]
async fn mark_unavailable_then_reassign_covers_all_jobs() {
    let world = TestWorld::new();
    let date = test_date();

    let alice = world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    for i in 0..3 {
        world
            .seed_approved_job(
                "Minneapolis",
                44.98 + i as f64 * 0.005,
                -93.26,
                60,
                &["compressor"],
                0,
            )
            .await;
    }
    let generated = world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("generate");
    assert_eq!(generated.total_assigned, 3);

    // Bob joins the roster after the day was planned.
    let bob = world
        .seed_tech("Bob", 44.99, -93.28, &["compressor"], date)
        .await;

    let marked = world
        .reassignment()
        .mark_unavailable(alice, date, "called in sick")
        .await
        .expect("mark unavailable");
    assert_eq!(marked.affected_appointments, 3);

    // Alice's jobs are back in the pool, her rows cancelled.
    let freed = world
        .reassignment()
        .freed_job_ids(alice, date)
        .await
        .expect("freed jobs");
    assert_eq!(freed.len(), 3);
    for job_id in &freed {
        let job = world.repo.get_job(*job_id).await.expect("job");
        assert_eq!(job.status, JobStatus::Approved);
    }

    let coverage = world
        .reassignment()
        .coverage_options(date)
        .await
        .expect("coverage options");
    assert_eq!(coverage.jobs_to_cover, 3);
    let bob_option = coverage
        .options
        .iter()
        .find(|o| o.staff_id == bob)
        .expect("bob listed");
    assert!(bob_option.can_cover_all);

    let reassigned = world
        .reassignment()
        .reassign(alice, bob, date, "sick day coverage")
        .await
        .expect("reassign");
    assert_eq!(reassigned.jobs_reassigned, 3);
    assert_eq!(reassigned.jobs_waitlisted, 0);

    // All three jobs now live on Bob, scheduled, without overlap.
    let bobs_day: Vec<_> = world
        .repo
        .list_staff_appointments(bob, date)
        .await
        .expect("bob appointments")
        .into_iter()
        .filter(|a| a.status != AppointmentStatus::Cancelled)
        .collect();
    assert_eq!(bobs_day.len(), 3);
    for (i, a) in bobs_day.iter().enumerate() {
        for b in bobs_day.iter().skip(i + 1) {
            assert!(!a.overlaps(b));
        }
    }
    for appt in &bobs_day {
        let job = world.repo.get_job(appt.job_id).await.expect("job");
        assert_eq!(job.status, JobStatus::Scheduled);
    }

    // The reassignment record captures the count.
    let records = world
        .repo
        .list_reassignments(date)
        .await
        .expect("reassignment records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].jobs_reassigned, 3);
    assert_eq!(records[0].original_staff_id, alice);
    assert_eq!(records[0].new_staff_id, bob);
}

#[tokio::test]
async fn reassign_waitlists_what_does_not_fit() {
    let world = TestWorld::new();
    let date = test_date();

    let alice = world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    // Three two-hour jobs fill Alice's day.
    for _ in 0..3 {
        world
            .seed_approved_job("Minneapolis", 44.98, -93.26, 120, &["compressor"], 0)
            .await;
    }
    let generated = world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("generate");
    assert_eq!(generated.total_assigned, 3);

    // Bob only works a short morning; he cannot absorb everything.
    let bob = world
        .seed_tech_with_window(
            "Bob",
            &["compressor"],
            date,
            support::hm(8, 0),
            support::hm(12, 0),
        )
        .await;

    world
        .reassignment()
        .mark_unavailable(alice, date, "truck broke down")
        .await
        .expect("mark unavailable");

    let reassigned = world
        .reassignment()
        .reassign(alice, bob, date, "partial coverage")
        .await
        .expect("reassign");

    assert!(reassigned.jobs_reassigned >= 1);
    assert!(reassigned.jobs_waitlisted >= 1);
    assert_eq!(reassigned.jobs_reassigned + reassigned.jobs_waitlisted, 3);

    let waitlist = world
        .repo
        .list_waitlist_for_date(date)
        .await
        .expect("waitlist");
    assert_eq!(waitlist.len(), reassigned.jobs_waitlisted);
}

#[tokio::test]
async fn reassign_to_same_staff_is_rejected() {
    let world = TestWorld::new();
    let date = test_date();
    let alice = world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;

    let result = world
        .reassignment()
        .reassign(alice, alice, date, "oops")
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn mark_unavailable_requires_reason() {
    let world = TestWorld::new();
    let date = test_date();
    let alice = world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;

    let result = world.reassignment().mark_unavailable(alice, date, "  ").await;
    assert!(result.is_err());
}
