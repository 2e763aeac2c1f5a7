use assert_matches::assert_matches;
use uuid::Uuid;

use queue_cell::QueueError;

use super::support::{TestContext, DAY};

#[tokio::test]
async fn test_move_to_front_renumbers_sequentially() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;
    let third = ctx.book(doctor_id, DAY, "10:30").await;

    ctx.resequencer()
        .move_appointment(third.id, 1)
        .await
        .expect("Failed to move appointment");

    let moved = ctx.appointment(third.id).await;
    assert_eq!(moved.token_number, 1);
    assert_eq!(moved.queue_position, Some(1));

    assert_eq!(ctx.appointment(first.id).await.token_number, 2);
    assert_eq!(ctx.appointment(second.id).await.token_number, 3);

    let status = ctx
        .estimator()
        .doctor_queue_status(doctor_id, DAY)
        .await
        .expect("Queue status failed");
    let order: Vec<Uuid> = status
        .appointments
        .iter()
        .map(|e| e.appointment_id)
        .collect();
    assert_eq!(order, vec![third.id, first.id, second.id]);
}

#[tokio::test]
async fn test_move_to_back() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;
    let third = ctx.book(doctor_id, DAY, "10:30").await;

    ctx.resequencer()
        .move_appointment(first.id, 3)
        .await
        .expect("Failed to move appointment");

    assert_eq!(ctx.appointment(second.id).await.token_number, 1);
    assert_eq!(ctx.appointment(third.id).await.token_number, 2);
    assert_eq!(ctx.appointment(first.id).await.token_number, 3);
}

#[tokio::test]
async fn test_move_to_same_position_is_noop() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;

    ctx.resequencer()
        .move_appointment(second.id, 2)
        .await
        .expect("Failed to move appointment");

    assert_eq!(ctx.appointment(first.id).await.token_number, 1);
    assert_eq!(ctx.appointment(second.id).await.token_number, 2);
}

#[tokio::test]
async fn test_move_out_of_range_rejected() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    ctx.book(doctor_id, DAY, "10:15").await;

    let too_low = ctx.resequencer().move_appointment(first.id, 0).await;
    assert_matches!(
        too_low.unwrap_err(),
        QueueError::PositionOutOfRange {
            requested: 0,
            queue_len: 2
        }
    );

    let too_high = ctx.resequencer().move_appointment(first.id, 3).await;
    assert_matches!(
        too_high.unwrap_err(),
        QueueError::PositionOutOfRange {
            requested: 3,
            queue_len: 2
        }
    );
}

#[tokio::test]
async fn test_move_unknown_appointment() {
    let ctx = TestContext::new();

    let result = ctx.resequencer().move_appointment(Uuid::new_v4(), 1).await;
    assert_matches!(result.unwrap_err(), QueueError::AppointmentNotFound(_));
}

#[tokio::test]
async fn test_move_skips_inactive_rows() {
    let ctx = TestContext::new();
    let doctor_id = ctx.seed_doctor(15).await;

    let first = ctx.book(doctor_id, DAY, "10:00").await;
    let second = ctx.book(doctor_id, DAY, "10:15").await;
    let third = ctx.book(doctor_id, DAY, "10:30").await;

    ctx.lifecycle()
        .cancel_appointment(first.id)
        .await
        .expect("Failed to cancel");

    // Active queue is now {2, 3}; the cancelled row takes no part.
    ctx.resequencer()
        .move_appointment(third.id, 1)
        .await
        .expect("Failed to move appointment");

    assert_eq!(ctx.appointment(third.id).await.token_number, 1);
    assert_eq!(ctx.appointment(second.id).await.token_number, 2);

    let cancelled = ctx.appointment(first.id).await;
    assert!(cancelled.is_cancelled());
    assert_eq!(
        cancelled.token_number, 1,
        "Cancelled rows keep their original token"
    );

    let out_of_range = ctx.resequencer().move_appointment(second.id, 3).await;
    assert_matches!(
        out_of_range.unwrap_err(),
        QueueError::PositionOutOfRange {
            requested: 3,
            queue_len: 2
        }
    );
}
