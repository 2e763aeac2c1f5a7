use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::locks::EngineLocks;
use crate::models::{Appointment, AppointmentStatus, BookAppointmentRequest};
use crate::services::position::active_day_queue;
use crate::store::EngineStores;

/// Assigns per-(doctor, day) token numbers and admits new bookings into the
/// day queue. Every mutation runs inside the day's critical section so
/// concurrent bookings can never observe the same max token.
pub struct TokenAllocator {
    stores: EngineStores,
    locks: Arc<EngineLocks>,
    config: Arc<AppConfig>,
}

impl TokenAllocator {
    pub fn new(stores: EngineStores, locks: Arc<EngineLocks>, config: Arc<AppConfig>) -> Self {
        Self {
            stores,
            locks,
            config,
        }
    }

    /// Next token for (doctor, day): max over non-cancelled bookings + 1,
    /// or 1 for an empty day.
    pub async fn assign_token(&self, doctor_id: Uuid, slot_date: &str) -> Result<u32, QueueError> {
        let lock = self.locks.for_day(doctor_id, slot_date).await;
        let _guard = lock.lock().await;
        self.next_token(doctor_id, slot_date).await
    }

    /// Full admission flow: token assignment, insertion, initial position and
    /// promotion to the queue, all under one lock acquisition.
    pub async fn create_booking(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, QueueError> {
        NaiveTime::parse_from_str(&request.slot_time, "%H:%M").map_err(|_| {
            QueueError::ValidationError(format!(
                "slot_time must be HH:MM, got {:?}",
                request.slot_time
            ))
        })?;
        if request.slot_date.trim().is_empty() {
            return Err(QueueError::ValidationError(
                "slot_date must not be empty".to_string(),
            ));
        }

        let lock = self
            .locks
            .for_day(request.doctor_id, &request.slot_date)
            .await;
        let _guard = lock.lock().await;

        let existing = self
            .stores
            .appointments
            .find_by_doctor_and_date(request.doctor_id, &request.slot_date)
            .await?;
        let token_number = Self::next_token_from(&existing);
        let appointments_before = active_day_queue(existing).len() as u32;

        let avg = match self.stores.doctors.get(request.doctor_id).await? {
            Some(doctor) if doctor.average_consultation_minutes > 0 => {
                doctor.average_consultation_minutes
            }
            _ => self.config.default_avg_consultation_minutes,
        };

        let now = self.stores.clock.now();
        let mut appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            slot_date: request.slot_date,
            slot_time: request.slot_time,
            token_number,
            queue_position: None,
            estimated_wait_minutes: None,
            status: AppointmentStatus::Pending,
            actual_start_time: None,
            actual_end_time: None,
            consultation_duration_minutes: None,
            is_delayed: false,
            delay_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.stores.appointments.insert(appointment.clone()).await?;

        // Initial position succeeded (it is this insert plus everything ahead
        // of it), so the booking joins the queue proper.
        appointment.queue_position = Some(appointments_before + 1);
        appointment.estimated_wait_minutes = Some(appointments_before as i64 * avg);
        appointment.status = AppointmentStatus::InQueue;
        appointment.updated_at = now;
        self.stores.appointments.update(appointment.clone()).await?;

        info!(
            "Booked appointment {} for doctor {} on {}: token {}, position {}",
            appointment.id,
            appointment.doctor_id,
            appointment.slot_date,
            token_number,
            appointments_before + 1
        );
        Ok(appointment)
    }

    async fn next_token(&self, doctor_id: Uuid, slot_date: &str) -> Result<u32, QueueError> {
        let existing = self
            .stores
            .appointments
            .find_by_doctor_and_date(doctor_id, slot_date)
            .await?;
        let token = Self::next_token_from(&existing);
        debug!(
            "Assigning token {} for doctor {} on {}",
            token, doctor_id, slot_date
        );
        Ok(token)
    }

    fn next_token_from(existing: &[Appointment]) -> u32 {
        existing
            .iter()
            .filter(|a| !a.is_cancelled())
            .map(|a| a.token_number)
            .max()
            .map_or(1, |max| max + 1)
    }
}
