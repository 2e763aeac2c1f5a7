use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{
    book_appointment, cancel_appointment, complete_consultation, get_delays, get_doctor_queue,
    get_position, get_suggestions, move_appointment, scan_delays, start_consultation,
    transition_status, update_doctor_status, upsert_doctor, EngineState,
};

pub fn create_queue_router(state: Arc<EngineState>) -> Router {
    Router::new()
        .route("/appointments", post(book_appointment))
        .route("/appointments/{appointment_id}/position", get(get_position))
        .route(
            "/appointments/{appointment_id}/start",
            post(start_consultation),
        )
        .route(
            "/appointments/{appointment_id}/complete",
            post(complete_consultation),
        )
        .route(
            "/appointments/{appointment_id}/status",
            post(transition_status),
        )
        .route(
            "/appointments/{appointment_id}/cancel",
            post(cancel_appointment),
        )
        .route("/appointments/{appointment_id}/move", post(move_appointment))
        .route("/doctors", put(upsert_doctor))
        .route("/doctors/{doctor_id}/queue", get(get_doctor_queue))
        .route("/doctors/{doctor_id}/status", post(update_doctor_status))
        .route("/doctors/{doctor_id}/delays", get(get_delays))
        .route("/doctors/{doctor_id}/delays/scan", post(scan_delays))
        .route("/doctors/{doctor_id}/suggestions", get(get_suggestions))
        .with_state(state)
}
