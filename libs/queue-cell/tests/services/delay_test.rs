use std::time::Duration;

use queue_cell::AppointmentStatus;

use super::support::{TestContext, DAY};

// The support clock pins "now" at 10:00, so slot times below are chosen
// relative to that.

#[tokio::test]
async fn test_detects_waiting_appointments_past_threshold() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let late = ctx.book(doctor_id, DAY, "09:30").await; // 30 minutes late
    ctx.book(doctor_id, DAY, "09:50").await; // 10 minutes, under threshold
    ctx.book(doctor_id, DAY, "10:30").await; // still in the future

    let delayed = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");

    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].appointment_id, late.id);
    assert_eq!(delayed[0].token_number, late.token_number);
    assert_eq!(delayed[0].delay_minutes, 30);
}

#[tokio::test]
async fn test_threshold_is_strict() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    // Exactly 15 minutes late: not yet delayed (threshold is exclusive).
    ctx.book(doctor_id, DAY, "09:45").await;
    let at_threshold = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert!(at_threshold.is_empty());

    ctx.clock.advance_minutes(1);
    let past_threshold = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert_eq!(past_threshold.len(), 1);
    assert_eq!(past_threshold[0].delay_minutes, 16);
}

#[tokio::test]
async fn test_detection_idempotent_after_flagging() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let late = ctx.book(doctor_id, DAY, "09:00").await;
    let detector = ctx.detector();

    let first_scan = detector
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert_eq!(first_scan.len(), 1);

    // Without the flag applied, a re-scan reports the same row again.
    let unflagged_rescan = detector
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert_eq!(unflagged_rescan, first_scan);

    let flagged = detector
        .flag_delayed(doctor_id, DAY, &first_scan, "running behind schedule")
        .await
        .expect("Flagging failed");
    assert_eq!(flagged, 1);

    let stored = ctx.appointment(late.id).await;
    assert!(stored.is_delayed);
    assert_eq!(
        stored.delay_reason.as_deref(),
        Some("running behind schedule")
    );

    // Flagged rows are excluded from subsequent scans.
    let second_scan = detector
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert!(second_scan.is_empty());

    // Re-flagging is a no-op.
    let reflagged = detector
        .flag_delayed(doctor_id, DAY, &first_scan, "running behind schedule")
        .await
        .expect("Flagging failed");
    assert_eq!(reflagged, 0);
}

#[tokio::test]
async fn test_flagging_queues_behind_the_day_critical_section() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;
    let late = ctx.book(doctor_id, DAY, "09:00").await;

    let records = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert_eq!(records.len(), 1);

    // Hold the day lock the way an in-flight transition would; flagging
    // must not write while it is held, or it would clobber that write.
    let day_lock = ctx.locks.for_day(doctor_id, DAY).await;
    let guard = day_lock.lock().await;

    let detector = ctx.detector();
    let handle = tokio::spawn(async move {
        detector
            .flag_delayed(doctor_id, DAY, &records, "running behind schedule")
            .await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished(), "flagging ran outside the day lock");
    assert!(!ctx.appointment(late.id).await.is_delayed);

    drop(guard);
    let flagged = handle
        .await
        .expect("Failed to join handle")
        .expect("Flagging failed");
    assert_eq!(flagged, 1);
    assert!(ctx.appointment(late.id).await.is_delayed);
}

#[tokio::test]
async fn test_only_waiting_appointments_are_scanned() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let serving = ctx.book(doctor_id, DAY, "09:00").await;
    ctx.lifecycle()
        .start_consultation(doctor_id, serving.id)
        .await
        .expect("Failed to start consultation");

    let cancelled = ctx.book(doctor_id, DAY, "09:05").await;
    ctx.lifecycle()
        .cancel_appointment(cancelled.id)
        .await
        .expect("Failed to cancel");

    let delayed = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert!(delayed.is_empty());
}

#[tokio::test]
async fn test_unparseable_slot_time_is_skipped() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    ctx.insert_raw(doctor_id, DAY, "morning", 1, AppointmentStatus::InQueue)
        .await;
    let late = ctx.book(doctor_id, DAY, "09:00").await;

    let delayed = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].appointment_id, late.id);
}

#[tokio::test]
async fn test_results_ordered_by_token() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    ctx.book(doctor_id, DAY, "09:00").await;
    ctx.book(doctor_id, DAY, "09:10").await;
    ctx.book(doctor_id, DAY, "09:20").await;

    let delayed = ctx
        .detector()
        .find_delayed(doctor_id, DAY)
        .await
        .expect("Delay scan failed");
    let tokens: Vec<u32> = delayed.iter().map(|r| r.token_number).collect();
    assert_eq!(tokens, vec![1, 2, 3]);
}
