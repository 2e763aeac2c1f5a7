use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(Uuid),

    #[error("Doctor not found: {0}")]
    DoctorNotFound(Uuid),

    #[error("Invalid appointment status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Doctor status {status} cannot be set directly: {reason}")]
    InvalidDoctorTransition { status: String, reason: String },

    #[error("Appointment {appointment_id} does not belong to doctor {doctor_id}")]
    OwnershipMismatch {
        appointment_id: Uuid,
        doctor_id: Uuid,
    },

    #[error("Position {requested} is out of range for a queue of {queue_len}")]
    PositionOutOfRange { requested: u32, queue_len: u32 },

    #[error("Doctor {doctor_id} is already in consultation with appointment {current}")]
    DoctorBusy { doctor_id: Uuid, current: Uuid },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}
