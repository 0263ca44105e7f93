//! Cancellation, rescheduling, waitlist, and gap-fill scenarios.

mod support;

use fieldops_rust::models::{AppointmentStatus, JobStatus};
use support::{hm, test_date, TestWorld};

async fn seed_one_scheduled_job(world: &TestWorld) -> fieldops_rust::models::Appointment {
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
    world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments")
        .into_iter()
        .next()
        .expect("one appointment")
}

/// Cancelling a confirmed appointment with `add_to_waitlist` creates one
/// waitlist entry for the same job and date.
#[tokio::test]
async fn cancel_with_waitlist_entry() {
    let world = TestWorld::new();
    let date = test_date();
    let appointment = seed_one_scheduled_job(&world).await;

    // Confirm it first; confirmed appointments are still cancellable.
    let confirmed = {
        let mut appt = appointment.clone();
        appt.status = AppointmentStatus::Confirmed;
        appt
    };
    world
        .repo
        .apply_schedule_mutation(
            date,
            fieldops_rust::db::ScheduleMutation {
                delete_appointments: vec![appointment.id],
                insert_appointments: vec![confirmed],
                ..Default::default()
            },
        )
        .await
        .expect("confirm");

    let response = world
        .conflicts()
        .cancel_appointment(appointment.id, "customer travelling", true, None)
        .await
        .expect("cancel");

    assert!(response.waitlist_entry_id.is_some());

    let waitlist = world
        .repo
        .list_waitlist_for_date(date)
        .await
        .expect("waitlist");
    assert_eq!(waitlist.len(), 1);
    assert_eq!(waitlist[0].job_id, appointment.job_id);
    assert_eq!(waitlist[0].preferred_date, appointment.date);

    let cancelled = world
        .repo
        .get_appointment(appointment.id)
        .await
        .expect("appointment");
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(cancelled.cancellation_reason.is_some());

    let job = world.repo.get_job(appointment.job_id).await.expect("job");
    assert_eq!(job.status, JobStatus::Approved);
}

#[tokio::test]
async fn cancel_completed_appointment_is_rejected() {
    let world = TestWorld::new();
    let date = test_date();
    let appointment = seed_one_scheduled_job(&world).await;

    // Drive the appointment (and job) to completion.
    let completed = {
        let mut appt = appointment.clone();
        appt.status = AppointmentStatus::Completed;
        appt
    };
    world
        .repo
        .apply_schedule_mutation(
            date,
            fieldops_rust::db::ScheduleMutation {
                delete_appointments: vec![appointment.id],
                insert_appointments: vec![completed],
                job_transitions: vec![
                    fieldops_rust::db::JobTransition {
                        job_id: appointment.job_id,
                        next_status: JobStatus::InProgress,
                        actor: None,
                        notes: None,
                    },
                    fieldops_rust::db::JobTransition {
                        job_id: appointment.job_id,
                        next_status: JobStatus::Completed,
                        actor: None,
                        notes: None,
                    },
                ],
                ..Default::default()
            },
        )
        .await
        .expect("complete");

    let result = world
        .conflicts()
        .cancel_appointment(appointment.id, "too late", false, None)
        .await;
    assert!(result.is_err(), "completed appointments cannot cancel");
}

/// Rescheduling cancels the original and links the replacement through
/// `rescheduled_from`.
#[tokio::test]
async fn reschedule_links_the_chain() {
    let world = TestWorld::new();
    let appointment = seed_one_scheduled_job(&world).await;

    let response = world
        .conflicts()
        .reschedule_appointment(
            appointment.id,
            appointment.date,
            hm(14, 0),
            hm(15, 0),
            None,
        )
        .await
        .expect("reschedule");

    let original = world
        .repo
        .get_appointment(appointment.id)
        .await
        .expect("original");
    assert_eq!(original.status, AppointmentStatus::Cancelled);

    let replacement = world
        .repo
        .get_appointment(response.new_appointment_id)
        .await
        .expect("replacement");
    assert_eq!(replacement.rescheduled_from, Some(appointment.id));
    assert_eq!(replacement.start_time, hm(14, 0));
    assert_eq!(replacement.status, AppointmentStatus::Scheduled);

    // The chain is linear: the replacement has exactly one predecessor
    // and the original has none.
    assert!(original.rescheduled_from.is_none());
}

#[tokio::test]
async fn reschedule_to_another_day() {
    let world = TestWorld::new();
    let appointment = seed_one_scheduled_job(&world).await;
    let next_day = appointment.date.succ_opt().expect("next day");
    world
        .repo
        .upsert_availability(&fieldops_rust::models::StaffAvailability::standard_day(
            appointment.staff_id,
            next_day,
        ))
        .await
        .expect("availability");

    let response = world
        .conflicts()
        .reschedule_appointment(appointment.id, next_day, hm(9, 0), hm(10, 0), None)
        .await
        .expect("reschedule");

    assert_eq!(response.new_date, next_day);
    let replacement = world
        .repo
        .get_appointment(response.new_appointment_id)
        .await
        .expect("replacement");
    assert_eq!(replacement.date, next_day);

    let job = world.repo.get_job(appointment.job_id).await.expect("job");
    assert_eq!(job.status, JobStatus::Scheduled);
}

#[tokio::test]
async fn overlapping_reschedule_is_rejected() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 60, &["compressor"], 0)
        .await;
    world
        .seed_approved_job("Minneapolis", 44.985, -93.265, 60, &["compressor"], 0)
        .await;
    world
        .generation()
        .generate(date, 5, None)
        .await
        .expect("generate");

    let mut appointments = world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments");
    appointments.sort_by_key(|a| a.start_time);
    assert_eq!(appointments.len(), 2);

    // Move the second exactly onto the first: state rejection.
    let result = world
        .conflicts()
        .reschedule_appointment(
            appointments[1].id,
            date,
            appointments[0].start_time,
            appointments[0].end_time,
            None,
        )
        .await;
    assert!(result.is_err());

    // Untouched on failure.
    let after = world
        .repo
        .get_appointment(appointments[1].id)
        .await
        .expect("appointment");
    assert_eq!(after.status, AppointmentStatus::Scheduled);
    assert_eq!(after.start_time, appointments[1].start_time);
}

#[tokio::test]
async fn fill_gap_ranks_by_priority_then_slack() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;

    // Three approved jobs of different priorities and sizes.
    let low_snug = world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 110, &["compressor"], 0)
        .await;
    let low_loose = world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 30, &["compressor"], 0)
        .await;
    let urgent = world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 60, &["compressor"], 2)
        .await;

    let response = world
        .conflicts()
        .fill_gap_suggestions(date, hm(9, 0), hm(11, 0), None)
        .await
        .expect("fill gap");

    assert_eq!(response.gap_duration_minutes, 120);
    let order: Vec<_> = response.suggestions.iter().map(|s| s.job_id).collect();
    assert_eq!(order.len(), 3);
    // Urgent first, then the snugger of the two low-priority fits.
    assert_eq!(order[0], urgent);
    assert_eq!(order[1], low_snug);
    assert_eq!(order[2], low_loose);
}

#[tokio::test]
async fn fill_gap_is_side_effect_free() {
    let world = TestWorld::new();
    let date = test_date();
    world
        .seed_tech("Alice", 44.98, -93.26, &["compressor"], date)
        .await;
    let job_id = world
        .seed_approved_job("Minneapolis", 44.98, -93.26, 60, &["compressor"], 0)
        .await;

    let _ = world
        .conflicts()
        .fill_gap_suggestions(date, hm(9, 0), hm(11, 0), None)
        .await
        .expect("fill gap");

    // The suggestion pass left the job and the day untouched.
    let job = world.repo.get_job(job_id).await.expect("job");
    assert_eq!(job.status, JobStatus::Approved);
    assert!(world
        .repo
        .list_appointments_for_date(date)
        .await
        .expect("appointments")
        .is_empty());
    assert!(world
        .repo
        .list_waitlist_for_date(date)
        .await
        .expect("waitlist")
        .is_empty());
}
