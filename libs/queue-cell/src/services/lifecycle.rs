use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::locks::EngineLocks;
use crate::models::{Appointment, AppointmentStatus, Doctor, DoctorStatus};
use crate::store::EngineStores;

/// Drives the appointment lifecycle and the doctor availability state,
/// keeping the two coupled: a doctor is `InConsult` exactly when one of
/// their appointments is, and `current_appointment_id` always points at it.
pub struct LifecycleService {
    stores: EngineStores,
    locks: Arc<EngineLocks>,
    config: Arc<AppConfig>,
}

impl LifecycleService {
    pub fn new(stores: EngineStores, locks: Arc<EngineLocks>, config: Arc<AppConfig>) -> Self {
        Self {
            stores,
            locks,
            config,
        }
    }

    /// Doctor-side entry point: begin serving an appointment.
    /// Ownership is checked before anything mutates.
    pub async fn start_consultation(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, QueueError> {
        let appointment = self.fetch_owned(doctor_id, appointment_id).await?;
        let updated = self
            .transition(appointment, AppointmentStatus::InConsult)
            .await?;
        info!(
            "Doctor {} started consultation for appointment {} (token {})",
            doctor_id, appointment_id, updated.token_number
        );
        Ok(updated)
    }

    /// Doctor-side entry point: finish serving an appointment, either as a
    /// normal completion or as a no-show. The doctor returns to `InClinic`
    /// in both branches.
    pub async fn complete_consultation(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        mark_no_show: bool,
    ) -> Result<Appointment, QueueError> {
        let appointment = self.fetch_owned(doctor_id, appointment_id).await?;
        let target = if mark_no_show {
            AppointmentStatus::NoShow
        } else {
            AppointmentStatus::Completed
        };
        let updated = self.transition(appointment, target).await?;
        info!(
            "Doctor {} closed appointment {} as {}",
            doctor_id, appointment_id, updated.status
        );
        Ok(updated)
    }

    /// Admin-level transition: any valid status move, with timestamps and
    /// doctor coupling applied the same way the doctor-facing entry points
    /// apply them.
    pub async fn transition_status(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, QueueError> {
        let appointment = self
            .stores
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(QueueError::AppointmentNotFound(appointment_id))?;
        self.transition(appointment, new_status).await
    }

    /// Patient/admin cancellation. Cancelled appointments disappear from
    /// every subsequent queue computation; releasing the doctor's slot map
    /// entry is the booking layer's job.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, QueueError> {
        self.transition_status(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    /// Direct doctor availability update. Transitions into or out of
    /// `InConsult` are owned by start/complete and rejected here so the
    /// coupling invariant cannot be bypassed.
    pub async fn update_doctor_status(
        &self,
        doctor_id: Uuid,
        status: DoctorStatus,
        break_minutes: Option<i64>,
    ) -> Result<Doctor, QueueError> {
        if status == DoctorStatus::InConsult {
            return Err(QueueError::InvalidDoctorTransition {
                status: status.to_string(),
                reason: "consultations begin via start_consultation".to_string(),
            });
        }

        let lock = self.locks.for_doctor(doctor_id).await;
        let _guard = lock.lock().await;

        let mut doctor = self
            .stores
            .doctors
            .get(doctor_id)
            .await?
            .ok_or(QueueError::DoctorNotFound(doctor_id))?;

        if doctor.status == DoctorStatus::InConsult {
            return Err(QueueError::InvalidDoctorTransition {
                status: status.to_string(),
                reason: "doctor is mid-consultation; complete it first".to_string(),
            });
        }

        let now = self.stores.clock.now();
        match status {
            DoctorStatus::OnBreak => {
                doctor.break_start_time = Some(now);
                doctor.break_duration_minutes =
                    Some(break_minutes.unwrap_or(self.config.default_break_minutes));
            }
            DoctorStatus::InClinic | DoctorStatus::Online => {
                doctor.break_start_time = None;
                doctor.break_duration_minutes = None;
            }
            _ => {}
        }
        doctor.status = status;
        doctor.updated_at = now;
        self.stores.doctors.upsert(doctor.clone()).await?;
        debug!("Doctor {} status set to {}", doctor_id, status);
        Ok(doctor)
    }

    /// Register or update doctor queue state (average consult time seed).
    pub async fn upsert_doctor(
        &self,
        doctor_id: Uuid,
        average_consultation_minutes: Option<i64>,
    ) -> Result<Doctor, QueueError> {
        if let Some(avg) = average_consultation_minutes {
            if avg <= 0 {
                return Err(QueueError::ValidationError(
                    "average_consultation_minutes must be positive".to_string(),
                ));
            }
        }
        let lock = self.locks.for_doctor(doctor_id).await;
        let _guard = lock.lock().await;

        let now = self.stores.clock.now();
        let mut doctor = match self.stores.doctors.get(doctor_id).await? {
            Some(existing) => existing,
            None => Doctor::new(doctor_id, now),
        };
        if let Some(avg) = average_consultation_minutes {
            doctor.average_consultation_minutes = avg;
        }
        doctor.updated_at = now;
        self.stores.doctors.upsert(doctor.clone()).await?;
        Ok(doctor)
    }

    // Private helpers

    async fn fetch_owned(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Appointment, QueueError> {
        let appointment = self
            .stores
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(QueueError::AppointmentNotFound(appointment_id))?;
        if appointment.doctor_id != doctor_id {
            warn!(
                "Doctor {} attempted to act on appointment {} owned by {}",
                doctor_id, appointment_id, appointment.doctor_id
            );
            return Err(QueueError::OwnershipMismatch {
                appointment_id,
                doctor_id,
            });
        }
        Ok(appointment)
    }

    /// Validated status write plus its side effects, under the day lock.
    async fn transition(
        &self,
        mut appointment: Appointment,
        new_status: AppointmentStatus,
    ) -> Result<Appointment, QueueError> {
        let lock = self
            .locks
            .for_day(appointment.doctor_id, &appointment.slot_date)
            .await;
        let _guard = lock.lock().await;

        // Doctor lock second, always in that order, so direct availability
        // updates cannot interleave with the coupled writes below.
        let doctor_lock = self.locks.for_doctor(appointment.doctor_id).await;
        let _doctor_guard = doctor_lock.lock().await;

        // Re-read under the lock; a concurrent transition may have won.
        appointment = self
            .stores
            .appointments
            .get(appointment.id)
            .await?
            .ok_or(QueueError::AppointmentNotFound(appointment.id))?;

        if !appointment.status.can_transition_to(&new_status) {
            return Err(QueueError::InvalidTransition {
                from: appointment.status.to_string(),
                to: new_status.to_string(),
            });
        }

        let now = self.stores.clock.now();
        let was_in_consult = appointment.status == AppointmentStatus::InConsult;

        match new_status {
            AppointmentStatus::InConsult => {
                let mut doctor = self
                    .stores
                    .doctors
                    .get(appointment.doctor_id)
                    .await?
                    .ok_or(QueueError::DoctorNotFound(appointment.doctor_id))?;
                if doctor.status == DoctorStatus::InConsult {
                    return Err(QueueError::DoctorBusy {
                        doctor_id: doctor.id,
                        current: doctor.current_appointment_id.unwrap_or(appointment.id),
                    });
                }
                appointment.actual_start_time = Some(now);
                doctor.status = DoctorStatus::InConsult;
                doctor.current_appointment_id = Some(appointment.id);
                doctor.break_start_time = None;
                doctor.break_duration_minutes = None;
                doctor.updated_at = now;
                self.stores.doctors.upsert(doctor).await?;
            }
            AppointmentStatus::Completed => {
                appointment.actual_end_time = Some(now);
                if let Some(start) = appointment.actual_start_time {
                    let seconds = (now - start).num_seconds().max(0);
                    appointment.consultation_duration_minutes = Some((seconds + 30) / 60);
                }
                self.release_doctor(appointment.doctor_id, appointment.id, now)
                    .await?;
            }
            AppointmentStatus::NoShow => {
                // No completion fields for a patient that was never served.
                self.release_doctor(appointment.doctor_id, appointment.id, now)
                    .await?;
            }
            AppointmentStatus::Cancelled => {
                if was_in_consult {
                    self.release_doctor(appointment.doctor_id, appointment.id, now)
                        .await?;
                }
            }
            AppointmentStatus::InQueue | AppointmentStatus::Pending => {}
        }

        appointment.status = new_status;
        appointment.updated_at = now;
        self.stores.appointments.update(appointment.clone()).await?;
        Ok(appointment)
    }

    /// Return the doctor to `InClinic` if this appointment is the one they
    /// are serving.
    async fn release_doctor(
        &self,
        doctor_id: Uuid,
        appointment_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), QueueError> {
        if let Some(mut doctor) = self.stores.doctors.get(doctor_id).await? {
            if doctor.current_appointment_id == Some(appointment_id) {
                doctor.status = DoctorStatus::InClinic;
                doctor.current_appointment_id = None;
                doctor.updated_at = now;
                self.stores.doctors.upsert(doctor).await?;
            }
        }
        Ok(())
    }
}
