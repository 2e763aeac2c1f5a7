use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::models::{Appointment, DoctorQueueStatus, DoctorStatus, QueueEntry, QueuePosition};
use crate::store::EngineStores;

/// Builds the derived day queue: active appointments for one (doctor, day),
/// token order ascending. Cancelled, completed and no-show rows never appear.
pub fn active_day_queue(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.retain(|a| a.is_active_in_queue());
    appointments.sort_by_key(|a| a.token_number);
    appointments
}

pub struct PositionEstimator {
    stores: EngineStores,
    config: Arc<AppConfig>,
}

impl PositionEstimator {
    pub fn new(stores: EngineStores, config: Arc<AppConfig>) -> Self {
        Self { stores, config }
    }

    /// Rank and projected wait for one appointment within its day queue.
    ///
    /// Recomputed from the store on every call; `None` when the appointment
    /// is not part of the active queue (unknown id, cancelled, or already
    /// served). Informational read, so missing doctor state degrades to the
    /// configured default average rather than failing.
    pub async fn compute_position(
        &self,
        appointment_id: Uuid,
        doctor_id: Uuid,
        slot_date: &str,
    ) -> Result<Option<QueuePosition>, QueueError> {
        let queue = active_day_queue(
            self.stores
                .appointments
                .find_by_doctor_and_date(doctor_id, slot_date)
                .await?,
        );

        let target = match queue.iter().find(|a| a.id == appointment_id) {
            Some(target) => target,
            None => {
                debug!(
                    "Appointment {} not in active queue for doctor {} on {}",
                    appointment_id, doctor_id, slot_date
                );
                return Ok(None);
            }
        };

        let appointments_before = queue
            .iter()
            .filter(|a| a.token_number < target.token_number)
            .count() as u32;
        let queue_position = (appointments_before + 1).max(1);

        let doctor = self.stores.doctors.get(doctor_id).await?;
        let avg = doctor
            .as_ref()
            .map(|d| d.average_consultation_minutes)
            .filter(|m| *m > 0)
            .unwrap_or(self.config.default_avg_consultation_minutes);

        // A doctor mid-consult with a later token has already passed the
        // target, so no wait remains ahead of it.
        let consulting_past_target = doctor.as_ref().is_some_and(|d| {
            d.status == DoctorStatus::InConsult
                && d.current_appointment_id
                    .is_some_and(|current| current != target.id)
                && queue
                    .iter()
                    .find(|a| Some(a.id) == d.current_appointment_id)
                    .is_some_and(|current| current.token_number > target.token_number)
        });

        let estimated_wait_minutes = if consulting_past_target {
            0
        } else {
            (appointments_before as i64 * avg).max(0)
        };

        Ok(Some(QueuePosition {
            appointment_id,
            token_number: target.token_number,
            queue_position,
            estimated_wait_minutes,
            total_in_queue: queue.len() as u32,
        }))
    }

    /// Doctor-facing snapshot of the day queue.
    pub async fn doctor_queue_status(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
    ) -> Result<DoctorQueueStatus, QueueError> {
        let doctor = self
            .stores
            .doctors
            .get(doctor_id)
            .await?
            .ok_or(QueueError::DoctorNotFound(doctor_id))?;

        let queue = active_day_queue(
            self.stores
                .appointments
                .find_by_doctor_and_date(doctor_id, slot_date)
                .await?,
        );

        Ok(DoctorQueueStatus {
            doctor_id,
            status: doctor.status,
            current_appointment_id: doctor.current_appointment_id,
            queue_length: queue.len() as u32,
            appointments: queue.iter().map(QueueEntry::from_appointment).collect(),
        })
    }
}
