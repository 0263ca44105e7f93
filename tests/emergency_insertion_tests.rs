//! Emergency insertion scenarios.

mod support;

use fieldops_rust::api::JobId;
use fieldops_rust::models::{AppointmentStatus, JobStatus};
use support::{test_date, TestWorld};

#[tokio::test]
async fn unknown_job_returns_failure_not_error() {
    let world = TestWorld::new();
    let response = world
        .emergency()
        .insert_emergency_job(JobId::new(), test_date(), 2)
        .await
        .expect("call succeeds");
    assert!(!response.success);
    assert!(response.message.to_lowercase().contains("not found"));
    assert!(response.assigned_staff_id.is_none());
}

#[tokio::test]
async fn inserts_into_open_gap() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 60, &["compressor"], 0)
        .await;
    world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("generate");

    let emergency_job = world
        .seed_approved_job("Minneapolis", 44.99, -93.27, 90, &["compressor"], 0)
        .await;
    let response = world
        .emergency()
        .insert_emergency_job(emergency_job, date, 3)
        .await
        .expect("insert");

    assert!(response.success, "message: {}", response.message);
    assert!(response.bumped_jobs.is_empty());
    assert!(response.assigned_staff_id.is_some());
    assert!(response.scheduled_time.is_some());

    let job = world.repo.get_job(emergency_job).await.expect("job");
    assert_eq!(job.status, JobStatus::Scheduled);
    assert_eq!(job.priority.value(), 3);
}

/// A packed day forces the inserter to bump a lower-priority job, which
/// lands on the waitlist for the same date.
#[tokio::test]
async fn packed_day_bumps_lower_priority_job() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    // Fill the day: ~3h jobs before and after lunch plus a closer.
    for duration in [170u32, 170, 60] {
        world
            .seed_approved_job("Minneapolis", 44.98, -93.26, duration, &["compressor"], 0)
            .await;
    }
    let generated = world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("generate");
    assert_eq!(generated.total_assigned, 3, "day should be packed");

    let mut emergency_job_id = None;
    {
        // Emergency repair with no preferred window.
        let job_id = world
            .seed_approved_job("Minneapolis", 44.98, -93.26, 150, &["compressor"], 3)
            .await;
        let mut job = world.repo.get_job(job_id).await.expect("job");
        job.preferred_time_start = None;
        job.preferred_time_end = None;
        // Re-seed through insert to update the stored row.
        world.repo.insert_job(&job).await.expect("update job");
        emergency_job_id = Some(job_id);
    }
    let emergency_job = emergency_job_id.expect("seeded");

    let response = world
        .emergency()
        .insert_emergency_job(emergency_job, date, 3)
        .await
        .expect("insert");

    assert!(response.success, "message: {}", response.message);
    assert!(!response.bumped_jobs.is_empty(), "expected bumped jobs");

    // Bumped jobs are waitlisted for the same date and back in the pool.
    let waitlist = world
        .repo
        .list_waitlist_for_date(date)
        .await
        .expect("waitlist");
    for bumped in &response.bumped_jobs {
        assert!(waitlist.iter().any(|w| w.job_id == *bumped));
        let job = world.repo.get_job(*bumped).await.expect("bumped job");
        assert_eq!(job.status, JobStatus::Approved);
    }

    // The bumped jobs' appointments are cancelled, not deleted.
    let appointments = world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments");
    for bumped in &response.bumped_jobs {
        assert!(appointments
            .iter()
            .filter(|a| a.job_id == *bumped)
            .all(|a| a.status == AppointmentStatus::Cancelled));
    }
}

/// No staff has a 240-minute contiguous stretch: the insertion fails with
/// a duration violation and writes nothing.
#[tokio::test]
async fn infeasible_duration_reports_violation() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech_with_window(
            "Shorty",
            &["compressor"],
            date,
            support::hm(8, 0),
            support::hm(11, 0),
        )
        .await;

    let job_id = world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 240, &["compressor"], 0)
        .await;
    let response = world
        .emergency()
        .insert_emergency_job(job_id, date, 2)
        .await
        .expect("insert");

    assert!(!response.success);
    assert!(response.assigned_staff_id.is_none());
    assert!(
        response.constraint_violations.contains(&"duration".to_string()),
        "violations: {:?}",
        response.constraint_violations
    );

    // Nothing was written.
    let appointments = world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments");
    assert!(appointments.is_empty());
    let job = world.repo.get_job(job_id).await.expect("job");
    assert_eq!(job.status, JobStatus::Approved);
}
