use assert_matches::assert_matches;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use queue_cell::{AppointmentStatus, BookAppointmentRequest, QueueError};

use super::support::{TestContext, DAY};

#[tokio::test]
async fn test_tokens_sequential_for_one_doctor_day() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;
    let third = ctx.book(doctor_id, DAY, "10:30").await;

    assert_eq!(first.token_number, 1);
    assert_eq!(second.token_number, 2);
    assert_eq!(third.token_number, 3);

    // Booking promotes straight into the queue with an initial position.
    assert_eq!(first.status, AppointmentStatus::InQueue);
    assert_eq!(third.queue_position, Some(3));
    assert_eq!(third.estimated_wait_minutes, Some(30));
}

#[tokio::test]
async fn test_tokens_independent_across_doctors_and_dates() {
    let ctx = TestContext::new();
    let doctor_a = ctx.seed_doctor(15).await;
    let doctor_b = ctx.seed_doctor(15).await;

    let a1 = ctx.book(doctor_a, DAY, "10:00").await;
    let b1 = ctx.book(doctor_b, DAY, "10:00").await;
    let a2 = ctx.book(doctor_a, DAY, "10:15").await;
    let other_day = ctx.book(doctor_a, "6_6_2025", "09:00").await;
    let b2 = ctx.book(doctor_b, DAY, "10:15").await;

    assert_eq!((a1.token_number, a2.token_number), (1, 2));
    assert_eq!((b1.token_number, b2.token_number), (1, 2));
    assert_eq!(other_day.token_number, 1);
}

#[tokio::test]
async fn test_assign_token_empty_day() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let token = ctx
        .allocator()
        .assign_token(doctor_id, DAY)
        .await
        .expect("Failed to assign token");
    assert_eq!(token, 1);
}

#[tokio::test]
async fn test_cancelled_middle_token_not_reassigned() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;
    let third = ctx.book(doctor_id, DAY, "10:30").await;

    ctx.lifecycle()
        .cancel_appointment(second.id)
        .await
        .expect("Failed to cancel");

    let fourth = ctx.book(doctor_id, DAY, "10:45").await;
    assert_eq!(third.token_number, 3);
    assert_eq!(fourth.token_number, 4);
}

#[tokio::test]
async fn test_concurrent_bookings_get_unique_tokens() {
    let ctx = Arc::new(TestContext::new());
    let doctor_id = ctx.seed_doctor(15).await;

    let mut handles = vec![];
    for i in 0..10 {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            ctx.allocator()
                .create_booking(BookAppointmentRequest {
                    doctor_id,
                    patient_id: Uuid::new_v4(),
                    slot_date: DAY.to_string(),
                    slot_time: format!("10:{:02}", i),
                })
                .await
                .expect("Failed to book")
                .token_number
        }));
    }

    let mut tokens = HashSet::new();
    for handle in handles {
        tokens.insert(handle.await.expect("Failed to join handle"));
    }

    let expected: HashSet<u32> = (1..=10).collect();
    assert_eq!(tokens, expected, "Tokens must be exactly 1..=10, no duplicates");
}

#[tokio::test]
async fn test_booking_rejects_bad_slot_time() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let result = ctx
        .allocator()
        .create_booking(BookAppointmentRequest {
            doctor_id,
            patient_id: Uuid::new_v4(),
            slot_date: DAY.to_string(),
            slot_time: "half past two".to_string(),
        })
        .await;

    assert_matches!(result.unwrap_err(), QueueError::ValidationError(_));
}

#[tokio::test]
async fn test_booking_rejects_empty_slot_date() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let result = ctx
        .allocator()
        .create_booking(BookAppointmentRequest {
            doctor_id,
            patient_id: Uuid::new_v4(),
            slot_date: "  ".to_string(),
            slot_time: "10:00".to_string(),
        })
        .await;

    assert_matches!(result.unwrap_err(), QueueError::ValidationError(_));
}
