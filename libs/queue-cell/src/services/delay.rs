use chrono::NaiveTime;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::locks::EngineLocks;
use crate::models::DelayRecord;
use crate::store::EngineStores;

/// Scans a doctor's day queue for bookings whose scheduled time has slipped
/// past the threshold without the patient being served.
pub struct DelayDetector {
    stores: EngineStores,
    locks: Arc<EngineLocks>,
    config: Arc<AppConfig>,
}

impl DelayDetector {
    pub fn new(stores: EngineStores, locks: Arc<EngineLocks>, config: Arc<AppConfig>) -> Self {
        Self {
            stores,
            locks,
            config,
        }
    }

    /// Pure read: waiting appointments more than the threshold past their
    /// slot time, excluding rows already flagged so repeated scans never
    /// double-count. Persisting the flag is `flag_delayed`'s job.
    pub async fn find_delayed(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
    ) -> Result<Vec<DelayRecord>, QueueError> {
        let now = self.stores.clock.now();
        let appointments = self
            .stores
            .appointments
            .find_by_doctor_and_date(doctor_id, slot_date)
            .await?;

        let mut delayed = Vec::new();
        for appointment in appointments {
            if !appointment.is_waiting() || appointment.is_delayed {
                continue;
            }
            let scheduled = match NaiveTime::parse_from_str(&appointment.slot_time, "%H:%M") {
                Ok(time) => now.date_naive().and_time(time).and_utc(),
                Err(_) => {
                    warn!(
                        "Appointment {} has unparseable slot_time {:?}; skipping delay check",
                        appointment.id, appointment.slot_time
                    );
                    continue;
                }
            };
            let delay_minutes = (now - scheduled).num_minutes();
            if delay_minutes > self.config.delay_threshold_minutes {
                delayed.push(DelayRecord {
                    appointment_id: appointment.id,
                    token_number: appointment.token_number,
                    delay_minutes,
                });
            }
        }

        delayed.sort_by_key(|r| r.token_number);
        debug!(
            "Delay scan for doctor {} on {}: {} delayed",
            doctor_id,
            slot_date,
            delayed.len()
        );
        Ok(delayed)
    }

    /// Persist the delayed flag for detected records. Idempotent: flagged
    /// rows are excluded from the next scan. Each row is re-read and written
    /// back whole, so the loop runs inside the day's critical section to
    /// keep it from interleaving with a concurrent transition.
    pub async fn flag_delayed(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
        records: &[DelayRecord],
        reason: &str,
    ) -> Result<usize, QueueError> {
        let lock = self.locks.for_day(doctor_id, slot_date).await;
        let _guard = lock.lock().await;

        let now = self.stores.clock.now();
        let mut flagged = 0;
        for record in records {
            let Some(mut appointment) =
                self.stores.appointments.get(record.appointment_id).await?
            else {
                continue;
            };
            if appointment.is_delayed {
                continue;
            }
            appointment.is_delayed = true;
            appointment.delay_reason = Some(reason.to_string());
            appointment.updated_at = now;
            self.stores.appointments.update(appointment).await?;
            flagged += 1;
        }
        Ok(flagged)
    }
}
