use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Single-writer critical sections for the engine's two mutable regions:
/// per-(doctor, day) queues and per-doctor availability state.
///
/// Token allocation, booking admission, consultation transitions, delay
/// flagging and resequencing all read-then-write the same day queue; each
/// of those flows holds the day lock for the duration of its
/// read-modify-write so concurrent requests for the same doctor/day
/// serialize. Doctor-state writes hold the doctor lock; a flow that needs
/// both takes the day lock first. Read-only queries skip both and tolerate
/// slightly stale results.
#[derive(Default)]
pub struct EngineLocks {
    day_queues: Mutex<HashMap<(Uuid, String), Arc<Mutex<()>>>>,
    doctors: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl EngineLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the mutex guarding one (doctor, slot_date) queue.
    pub async fn for_day(&self, doctor_id: Uuid, slot_date: &str) -> Arc<Mutex<()>> {
        let mut locks = self.day_queues.lock().await;
        locks
            .entry((doctor_id, slot_date.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch (or create) the mutex guarding one doctor's availability state.
    pub async fn for_doctor(&self, doctor_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.doctors.lock().await;
        locks
            .entry(doctor_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
