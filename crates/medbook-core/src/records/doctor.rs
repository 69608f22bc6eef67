//! Doctor profile operations.

use super::{RecordError, RecordResult, Records};
use crate::models::Doctor;
use crate::store::{load_doctor, save_doctor};

impl Records<'_> {
    pub fn get_doctor(&self) -> RecordResult<Option<Doctor>> {
        Ok(load_doctor(self.store)?)
    }

    /// Save the doctor profile, keeping a single primary ambulatory.
    pub fn save_doctor(&self, mut doctor: Doctor) -> RecordResult<Doctor> {
        if doctor.id.is_empty() {
            doctor.id = uuid::Uuid::new_v4().to_string();
        }
        doctor.normalize_primary(None);
        doctor.touch();
        save_doctor(self.store, &doctor)?;
        Ok(doctor)
    }

    /// Mark one ambulatory as primary.
    pub fn set_primary_ambulatory(&self, ambulatory_id: &str) -> RecordResult<Doctor> {
        let mut doctor = self
            .get_doctor()?
            .ok_or_else(|| RecordError::NotFound("doctor".to_string()))?;

        if !doctor.ambulatories.iter().any(|a| a.id == ambulatory_id) {
            return Err(RecordError::NotFound(ambulatory_id.to_string()));
        }
        for ambulatory in &mut doctor.ambulatories {
            ambulatory.is_primary = ambulatory.id == ambulatory_id;
        }
        self.save_doctor(doctor)
    }
}
