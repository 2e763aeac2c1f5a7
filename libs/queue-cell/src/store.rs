use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::QueueError;
use crate::models::{Appointment, Doctor};

/// Appointment persistence seam. The engine never assumes a storage
/// technology; anything that can look bookings up by id and by
/// (doctor, day) works.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<(), QueueError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, QueueError>;

    async fn update(&self, appointment: Appointment) -> Result<(), QueueError>;

    /// All appointments for one (doctor, day), in no particular order.
    /// Callers filter and sort; the day queue is always derived fresh.
    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
    ) -> Result<Vec<Appointment>, QueueError>;
}

#[async_trait]
pub trait DoctorStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Doctor>, QueueError>;

    async fn upsert(&self, doctor: Doctor) -> Result<(), QueueError>;
}

/// Time source, injectable so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ==============================================================================
// IN-MEMORY IMPLEMENTATIONS
// ==============================================================================

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<(), QueueError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(QueueError::ValidationError(format!(
                "appointment {} already exists",
                appointment.id
            )));
        }
        appointments.insert(appointment.id, appointment);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, QueueError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&id).cloned())
    }

    async fn update(&self, appointment: Appointment) -> Result<(), QueueError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(QueueError::AppointmentNotFound(appointment.id));
        }
        appointments.insert(appointment.id, appointment);
        Ok(())
    }

    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        slot_date: &str,
    ) -> Result<Vec<Appointment>, QueueError> {
        let appointments = self.appointments.read().await;
        Ok(appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.slot_date == slot_date)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDoctorStore {
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryDoctorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DoctorStore for InMemoryDoctorStore {
    async fn get(&self, id: Uuid) -> Result<Option<Doctor>, QueueError> {
        let doctors = self.doctors.read().await;
        Ok(doctors.get(&id).cloned())
    }

    async fn upsert(&self, doctor: Doctor) -> Result<(), QueueError> {
        let mut doctors = self.doctors.write().await;
        doctors.insert(doctor.id, doctor);
        Ok(())
    }
}

/// Handles to the stores and clock a service needs, bundled so service
/// constructors stay short.
#[derive(Clone)]
pub struct EngineStores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub doctors: Arc<dyn DoctorStore>,
    pub clock: Arc<dyn Clock>,
}

impl EngineStores {
    pub fn in_memory() -> Self {
        Self {
            appointments: Arc::new(InMemoryAppointmentStore::new()),
            doctors: Arc::new(InMemoryDoctorStore::new()),
            clock: Arc::new(SystemClock),
        }
    }
}
