use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::QueueError;
use crate::locks::EngineLocks;
use crate::services::position::active_day_queue;
use crate::store::EngineStores;

/// Explicit queue re-ordering: the only operation allowed to renumber
/// tokens, and only ever inside the day's critical section.
pub struct ResequenceService {
    stores: EngineStores,
    locks: Arc<EngineLocks>,
}

impl ResequenceService {
    pub fn new(stores: EngineStores, locks: Arc<EngineLocks>) -> Self {
        Self { stores, locks }
    }

    /// Move an appointment to a 1-based position in its day queue and
    /// renumber tokens/positions sequentially from 1.
    pub async fn move_appointment(
        &self,
        appointment_id: Uuid,
        new_position: u32,
    ) -> Result<(), QueueError> {
        let appointment = self
            .stores
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(QueueError::AppointmentNotFound(appointment_id))?;

        let lock = self
            .locks
            .for_day(appointment.doctor_id, &appointment.slot_date)
            .await;
        let _guard = lock.lock().await;

        let mut queue = active_day_queue(
            self.stores
                .appointments
                .find_by_doctor_and_date(appointment.doctor_id, &appointment.slot_date)
                .await?,
        );

        let current_index = queue
            .iter()
            .position(|a| a.id == appointment_id)
            .ok_or(QueueError::AppointmentNotFound(appointment_id))?;

        let queue_len = queue.len() as u32;
        if new_position < 1 || new_position > queue_len {
            return Err(QueueError::PositionOutOfRange {
                requested: new_position,
                queue_len,
            });
        }

        let moved = queue.remove(current_index);
        queue.insert((new_position - 1) as usize, moved);

        let now = self.stores.clock.now();
        for (index, entry) in queue.iter_mut().enumerate() {
            let sequential = index as u32 + 1;
            if entry.token_number == sequential && entry.queue_position == Some(sequential) {
                continue;
            }
            entry.token_number = sequential;
            entry.queue_position = Some(sequential);
            entry.updated_at = now;
            self.stores.appointments.update(entry.clone()).await?;
        }

        info!(
            "Moved appointment {} to position {} for doctor {} on {}",
            appointment_id, new_position, appointment.doctor_id, appointment.slot_date
        );
        Ok(())
    }
}
