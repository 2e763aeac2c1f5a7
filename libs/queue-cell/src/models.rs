use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE QUEUE MODELS
// ==============================================================================

/// One booking against a doctor's day queue.
///
/// `slot_date` is an opaque day-granularity key supplied by the caller; the
/// engine only ever compares it for equality. `slot_time` is a "HH:MM"
/// time-of-day string used by delay detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
    pub token_number: u32,
    pub queue_position: Option<u32>,
    pub estimated_wait_minutes: Option<i64>,
    pub status: AppointmentStatus,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub consultation_duration_minutes: Option<i64>,
    pub is_delayed: bool,
    pub delay_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The status enum is the single source of truth; cancellation is a
    /// derived view, never a separate flag.
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    pub fn is_completed(&self) -> bool {
        self.status == AppointmentStatus::Completed
    }

    /// Whether this appointment occupies a slot in the day queue.
    pub fn is_active_in_queue(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::InQueue | AppointmentStatus::InConsult
        )
    }

    /// Whether this appointment is still waiting to be served.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::InQueue
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    InQueue,
    InConsult,
    Completed,
    NoShow,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::InQueue => write!(f, "in_queue"),
            AppointmentStatus::InConsult => write!(f, "in_consult"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::NoShow | AppointmentStatus::Cancelled
        )
    }

    pub fn can_transition_to(&self, target: &AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, target) {
            (Pending, InQueue) => true,
            (Pending, InConsult) => true,
            (InQueue, InConsult) => true,
            (InConsult, Completed) => true,
            (InConsult, NoShow) => true,
            (_, Cancelled) => !self.is_terminal(),
            _ => false,
        }
    }
}

// ==============================================================================
// DOCTOR AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub status: DoctorStatus,
    pub current_appointment_id: Option<Uuid>,
    pub average_consultation_minutes: i64,
    pub break_start_time: Option<DateTime<Utc>>,
    pub break_duration_minutes: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: DoctorStatus::InClinic,
            current_appointment_id: None,
            average_consultation_minutes: 15,
            break_start_time: None,
            break_duration_minutes: None,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    InClinic,
    InConsult,
    OnBreak,
    Unavailable,
    Online,
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::InClinic => write!(f, "in_clinic"),
            DoctorStatus::InConsult => write!(f, "in_consult"),
            DoctorStatus::OnBreak => write!(f, "on_break"),
            DoctorStatus::Unavailable => write!(f, "unavailable"),
            DoctorStatus::Online => write!(f, "online"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteConsultationRequest {
    pub doctor_id: Uuid,
    #[serde(default)]
    pub mark_no_show: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartConsultationRequest {
    pub doctor_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorStatusRequest {
    pub status: DoctorStatus,
    pub break_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionStatusRequest {
    pub new_status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAppointmentRequest {
    pub new_position: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertDoctorRequest {
    pub doctor_id: Uuid,
    pub average_consultation_minutes: Option<i64>,
}

// ==============================================================================
// QUERY RESULT MODELS
// ==============================================================================

/// Live position of one appointment within its day queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueuePosition {
    pub appointment_id: Uuid,
    pub token_number: u32,
    pub queue_position: u32,
    pub estimated_wait_minutes: i64,
    pub total_in_queue: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorQueueStatus {
    pub doctor_id: Uuid,
    pub status: DoctorStatus,
    pub current_appointment_id: Option<Uuid>,
    pub queue_length: u32,
    pub appointments: Vec<QueueEntry>,
}

/// Compact day-queue row for doctor-facing display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub token_number: u32,
    pub slot_time: String,
    pub status: AppointmentStatus,
    pub is_delayed: bool,
}

impl QueueEntry {
    pub fn from_appointment(appointment: &Appointment) -> Self {
        Self {
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            token_number: appointment.token_number,
            slot_time: appointment.slot_time.clone(),
            status: appointment.status,
            is_delayed: appointment.is_delayed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelayRecord {
    pub appointment_id: Uuid,
    pub token_number: u32,
    pub delay_minutes: i64,
}

// ==============================================================================
// SCHEDULING ADVISOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub suggestion_type: SuggestionType,
    pub appointment_id: Uuid,
    pub token_number: u32,
    pub message: String,
    pub time_saved_minutes: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    NoShowPullForward,
    EarlyFinishPullForward,
    FollowUpPromotion,
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionType::NoShowPullForward => write!(f, "no_show_pull_forward"),
            SuggestionType::EarlyFinishPullForward => write!(f, "early_finish_pull_forward"),
            SuggestionType::FollowUpPromotion => write!(f, "follow_up_promotion"),
        }
    }
}
