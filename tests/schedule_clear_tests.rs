//! Clear-and-audit scenarios, including snapshot round-trip.

mod support;

use fieldops_rust::models::JobStatus;
use support::{test_date, TestWorld};

#[tokio::test]
async fn clear_resets_jobs_and_writes_audit() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    world
        .seed_tech("Bob", 44.99, -93.28, &["compressor"], date)
        .await;
    for i in 0..4 {
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
    assert_eq!(generated.total_assigned, 4);

    let response = world
        .clearing()
        .clear_schedule(date, None, Some("rain day".to_string()))
        .await
        .expect("clear");

    assert_eq!(response.appointments_cleared, 4);
    assert_eq!(response.jobs_reset.len(), 4);

    // The day is empty and every job is schedulable again.
    assert!(world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments")
        .is_empty());
    for job_id in &response.jobs_reset {
        let job = world.repo.get_job(*job_id).await.expect("job");
        assert_eq!(job.status, JobStatus::Approved);
    }

    // One audit row with a snapshot blob of matching length.
    let clears = world.clearing().recent_clears(10).await.expect("recent");
    assert_eq!(clears.len(), 1);
    assert_eq!(clears[0].appointment_count, 4);
    assert_eq!(clears[0].notes.as_deref(), Some("rain day"));

    let snapshot = world
        .clearing()
        .decode_snapshot(clears[0].id)
        .await
        .expect("decode snapshot");
    assert_eq!(snapshot.appointments.len(), 4);
    assert_eq!(snapshot.schedule_date, date);
}

#[tokio::test]
async fn clear_empty_day_writes_empty_audit() {
    let world = TestWorld::new();
    let date = test_date();

    let response = world
        .clearing()
        .clear_schedule(date, None, None)
        .await
        .expect("clear");
    assert_eq!(response.appointments_cleared, 0);
    assert!(response.jobs_reset.is_empty());

    let clears = world.clearing().recent_clears(10).await.expect("recent");
    assert_eq!(clears.len(), 1);
    assert_eq!(clears[0].appointment_count, 0);
}

/// Round-trip: clearing a date and regenerating with the same seed over
/// the restored pool reproduces the cleared assignments.
#[tokio::test]
async fn clear_then_regenerate_reproduces_assignments() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.970, -93.250, &["compressor"], date)
        .await;
    world
        .seed_tech("Bob", 44.990, -93.280, &["compressor"], date)
        .await;
    for i in 0..5 {
        world
            .seed_approved_job(
                "Minneapolis",
                44.95 + i as f64 * 0.01,
                -93.20 - i as f64 * 0.008,
                60,
                &["compressor"],
                0,
            )
            .await;
    }

    let first = world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("first generate");
    assert!(first.is_feasible);

    let cleared = world
        .clearing()
        .clear_schedule(date, None, None)
        .await
        .expect("clear");
    let snapshot = world
        .clearing()
        .decode_snapshot(cleared.audit_id)
        .await
        .expect("snapshot");

    let second = world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("second generate");

    // Same pool, same seed: the regenerated plan matches the snapshot.
    let mut snapshot_slots: Vec<_> = snapshot
        .appointments
        .iter()
        .map(|a| (a.job_id, a.staff_id, a.start_time, a.end_time))
        .collect();
    snapshot_slots.sort();

    let mut regenerated_slots = Vec::new();
    for assignment in &second.assignments {
        for job in &assignment.jobs {
            regenerated_slots.push((
                job.job_id,
                assignment.staff_id,
                job.start_time,
                job.end_time,
            ));
        }
    }
    regenerated_slots.sort();

    assert_eq!(snapshot_slots, regenerated_slots);
}

#[tokio::test]
async fn snapshot_checksum_guards_the_blob() {
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

    let cleared = world
        .clearing()
        .clear_schedule(date, None, None)
        .await
        .expect("clear");

    // The decode path verifies the stored checksum.
    let snapshot = world
        .clearing()
        .decode_snapshot(cleared.audit_id)
        .await
        .expect("decode");
    assert_eq!(snapshot.appointments.len(), 1);
}
