use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::error::QueueError;
use crate::models::{Appointment, AppointmentStatus, Suggestion, SuggestionType};
use crate::services::position::active_day_queue;
use crate::store::EngineStores;

/// Heuristic re-sequencing advisor. Pure: it only ever returns suggestion
/// records; applying one is the resequencer's explicit, separate operation.
pub struct SchedulingAdvisor {
    stores: EngineStores,
    config: Arc<AppConfig>,
}

impl SchedulingAdvisor {
    pub fn new(stores: EngineStores, config: Arc<AppConfig>) -> Self {
        Self { stores, config }
    }

    /// Evaluate the heuristics after a consultation ends (or on demand).
    /// `current_appointment_id` is the appointment that just finished or is
    /// being served. Unknown references yield an empty list; this feeds
    /// informational UI only.
    pub async fn suggest(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
        current_appointment_id: Uuid,
    ) -> Result<Vec<Suggestion>, QueueError> {
        let Some(current) = self.stores.appointments.get(current_appointment_id).await? else {
            debug!(
                "Advisor: reference appointment {} not found, no suggestions",
                current_appointment_id
            );
            return Ok(Vec::new());
        };

        let active = active_day_queue(
            self.stores
                .appointments
                .find_by_doctor_and_date(doctor_id, slot_date)
                .await?,
        );
        let waiting: Vec<&Appointment> = active.iter().filter(|a| a.is_waiting()).collect();

        let avg = match self.stores.doctors.get(doctor_id).await? {
            Some(doctor) if doctor.average_consultation_minutes > 0 => {
                doctor.average_consultation_minutes
            }
            _ => self.config.default_avg_consultation_minutes,
        };

        let mut suggestions = Vec::new();

        // 1. No-show: pull the next waiting patient forward.
        if current.status == AppointmentStatus::NoShow {
            if let Some(next) = waiting.first() {
                suggestions.push(Suggestion {
                    suggestion_type: SuggestionType::NoShowPullForward,
                    appointment_id: next.id,
                    token_number: next.token_number,
                    message: format!(
                        "Token {} was a no-show; call token {} now",
                        current.token_number, next.token_number
                    ),
                    time_saved_minutes: None,
                });
            }
        }

        // 2. Early finish: the consult took under half the doctor's average.
        if let Some(elapsed) = self.elapsed_minutes(&current) {
            if elapsed * 2 < avg {
                if let Some(next) = waiting.first() {
                    suggestions.push(Suggestion {
                        suggestion_type: SuggestionType::EarlyFinishPullForward,
                        appointment_id: next.id,
                        token_number: next.token_number,
                        message: format!(
                            "Consultation finished {} minutes early; call token {} ahead of schedule",
                            avg - elapsed,
                            next.token_number
                        ),
                        time_saved_minutes: Some(avg - elapsed),
                    });
                }
            }
        }

        // 3. Follow-up promotion: the waiting head is itself displaced and a
        //    deprioritised booking sits deeper than position 2. Coarse by
        //    design; the doctor decides whether to apply it.
        if let (Some(&head), Some(&tail)) = (waiting.first(), waiting.last()) {
            let head_position = Self::position_of(&active, head);
            let tail_position = Self::position_of(&active, tail);
            if head_position > 1 && tail_position > 2 {
                suggestions.push(Suggestion {
                    suggestion_type: SuggestionType::FollowUpPromotion,
                    appointment_id: tail.id,
                    token_number: tail.token_number,
                    message: format!(
                        "Queue has a filled gap; consider moving token {} to position 1",
                        tail.token_number
                    ),
                    time_saved_minutes: None,
                });
            }
        }

        debug!(
            "Advisor produced {} suggestion(s) for doctor {} on {}",
            suggestions.len(),
            doctor_id,
            slot_date
        );
        Ok(suggestions)
    }

    fn elapsed_minutes(&self, appointment: &Appointment) -> Option<i64> {
        if let Some(duration) = appointment.consultation_duration_minutes {
            return Some(duration);
        }
        let start = appointment.actual_start_time?;
        let end = appointment
            .actual_end_time
            .unwrap_or_else(|| self.stores.clock.now());
        let seconds = (end - start).num_seconds().max(0);
        Some((seconds + 30) / 60)
    }

    fn position_of(active: &[Appointment], target: &Appointment) -> u32 {
        active
            .iter()
            .filter(|a| a.token_number < target.token_number)
            .count() as u32
            + 1
    }
}
