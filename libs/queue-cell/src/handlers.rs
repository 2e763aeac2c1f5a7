use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::AppError;

use crate::error::QueueError;
use crate::locks::EngineLocks;
use crate::models::{
    BookAppointmentRequest, CompleteConsultationRequest, MoveAppointmentRequest,
    StartConsultationRequest, TransitionStatusRequest, UpdateDoctorStatusRequest,
    UpsertDoctorRequest,
};
use crate::services::{
    DelayDetector, LifecycleService, PositionEstimator, ResequenceService, SchedulingAdvisor,
    TokenAllocator,
};
use crate::store::EngineStores;

/// Shared state handed to every handler: config, the store seams, and the
/// per-day lock registry.
#[derive(Clone)]
pub struct EngineState {
    pub config: Arc<AppConfig>,
    pub stores: EngineStores,
    pub locks: Arc<EngineLocks>,
}

impl EngineState {
    pub fn new(config: Arc<AppConfig>, stores: EngineStores) -> Self {
        Self {
            config,
            stores,
            locks: Arc::new(EngineLocks::new()),
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::new(config, EngineStores::in_memory())
    }
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub slot_date: String,
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    pub doctor_id: Uuid,
    pub slot_date: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub slot_date: String,
    pub current_appointment_id: Uuid,
}

fn map_queue_error(err: QueueError) -> AppError {
    match err {
        QueueError::AppointmentNotFound(_) | QueueError::DoctorNotFound(_) => {
            AppError::NotFound(err.to_string())
        }
        QueueError::OwnershipMismatch { .. } => AppError::Forbidden(err.to_string()),
        QueueError::DoctorBusy { .. } => AppError::Conflict(err.to_string()),
        QueueError::InvalidTransition { .. }
        | QueueError::InvalidDoctorTransition { .. }
        | QueueError::PositionOutOfRange { .. } => AppError::BadRequest(err.to_string()),
        QueueError::ValidationError(_) => AppError::ValidationError(err.to_string()),
        QueueError::StoreError(_) => AppError::Internal(err.to_string()),
    }
}

/// Book an appointment: token assignment plus initial queue position.
pub async fn book_appointment(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Booking request: doctor {} patient {} on {}",
        request.doctor_id, request.patient_id, request.slot_date
    );
    let allocator = TokenAllocator::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let appointment = allocator
        .create_booking(request)
        .await
        .map_err(map_queue_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// Patient-facing live position poll.
pub async fn get_position(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Query(query): Query<PositionQuery>,
) -> Result<Json<Value>, AppError> {
    let estimator = PositionEstimator::new(state.stores.clone(), state.config.clone());
    let position = estimator
        .compute_position(appointment_id, query.doctor_id, &query.slot_date)
        .await
        .map_err(map_queue_error)?;

    match position {
        Some(position) => Ok(Json(json!({
            "queue_position": position.queue_position,
            "estimated_wait_minutes": position.estimated_wait_minutes,
            "total_in_queue": position.total_in_queue,
            "token_number": position.token_number
        }))),
        None => Err(AppError::NotFound(
            "Appointment not found in the active queue".to_string(),
        )),
    }
}

/// Doctor-facing day-queue snapshot.
pub async fn get_doctor_queue(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let estimator = PositionEstimator::new(state.stores.clone(), state.config.clone());
    let status = estimator
        .doctor_queue_status(doctor_id, &query.slot_date)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!(status)))
}

pub async fn start_consultation(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StartConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let appointment = lifecycle
        .start_consultation(request.doctor_id, appointment_id)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn complete_consultation(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CompleteConsultationRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let appointment = lifecycle
        .complete_consultation(request.doctor_id, appointment_id, request.mark_no_show)
        .await
        .map_err(map_queue_error)?;

    // Re-evaluate the advisor so the doctor app can show follow-up actions
    // in the same response.
    let advisor = SchedulingAdvisor::new(state.stores.clone(), state.config.clone());
    let suggestions = advisor
        .suggest(appointment.doctor_id, &appointment.slot_date, appointment_id)
        .await
        .map_err(map_queue_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "suggestions": suggestions
    })))
}

/// Admin-level appointment status transition.
pub async fn transition_status(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<TransitionStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let appointment = lifecycle
        .transition_status(appointment_id, request.new_status)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn cancel_appointment(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let appointment = lifecycle
        .cancel_appointment(appointment_id)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn update_doctor_status(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let doctor = lifecycle
        .update_doctor_status(doctor_id, request.status, request.break_duration_minutes)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

pub async fn upsert_doctor(
    State(state): State<Arc<EngineState>>,
    Json(request): Json<UpsertDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let lifecycle = LifecycleService::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let doctor = lifecycle
        .upsert_doctor(request.doctor_id, request.average_consultation_minutes)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

/// Pure delay scan (no side effects).
pub async fn get_delays(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let detector = DelayDetector::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let delayed = detector
        .find_delayed(doctor_id, &query.slot_date)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slot_date": query.slot_date,
        "delayed": delayed
    })))
}

/// Detect and persist delay flags in one poll.
pub async fn scan_delays(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let detector = DelayDetector::new(
        state.stores.clone(),
        state.locks.clone(),
        state.config.clone(),
    );
    let delayed = detector
        .find_delayed(doctor_id, &query.slot_date)
        .await
        .map_err(map_queue_error)?;
    let flagged = detector
        .flag_delayed(doctor_id, &query.slot_date, &delayed, "running behind schedule")
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slot_date": query.slot_date,
        "delayed": delayed,
        "flagged": flagged
    })))
}

pub async fn get_suggestions(
    State(state): State<Arc<EngineState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<Value>, AppError> {
    let advisor = SchedulingAdvisor::new(state.stores.clone(), state.config.clone());
    let suggestions = advisor
        .suggest(doctor_id, &query.slot_date, query.current_appointment_id)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "doctor_id": doctor_id,
        "suggestions": suggestions
    })))
}

pub async fn move_appointment(
    State(state): State<Arc<EngineState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<MoveAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let resequencer = ResequenceService::new(state.stores.clone(), state.locks.clone());
    resequencer
        .move_appointment(appointment_id, request.new_position)
        .await
        .map_err(map_queue_error)?;
    Ok(Json(json!({
        "success": true,
        "message": "Queue re-sequenced"
    })))
}
