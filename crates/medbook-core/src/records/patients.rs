//! Patient operations.

use super::{RecordError, RecordResult, Records};
use crate::models::{normalize_fiscal_code, ExamRequest, Patient, Visit};
use crate::store::keys;

impl Records<'_> {
    /// List all patients, sorted by surname then name.
    pub fn list_patients(&self) -> RecordResult<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.load(keys::PATIENTS)?;
        patients.sort_by_key(|p| (p.surname.to_lowercase(), p.name.to_lowercase()));
        Ok(patients)
    }

    /// Get a patient by id.
    pub fn get_patient(&self, id: &str) -> RecordResult<Option<Patient>> {
        self.get(keys::PATIENTS, id)
    }

    /// Find a patient by fiscal code (case and padding insensitive).
    pub fn find_patient_by_fiscal_code(&self, fiscal_code: &str) -> RecordResult<Option<Patient>> {
        let Some(code) = normalize_fiscal_code(fiscal_code) else {
            return Ok(None);
        };
        Ok(self
            .load::<Patient>(keys::PATIENTS)?
            .into_iter()
            .find(|p| p.normalized_fiscal_code().as_deref() == Some(code.as_str())))
    }

    /// Search patients by name, surname or fiscal code (substring match).
    pub fn search_patients(&self, query: &str, limit: usize) -> RecordResult<Vec<Patient>> {
        let needle = query.trim().to_lowercase();
        let matches = self
            .list_patients()?
            .into_iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.surname.to_lowercase().contains(&needle)
                    || p.display_name().to_lowercase().contains(&needle)
                    || p.fiscal_code
                        .as_deref()
                        .map(|c| c.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .take(limit)
            .collect();
        Ok(matches)
    }

    /// Insert a new patient. Fails if the fiscal code is already in use.
    pub fn add_patient(&self, mut patient: Patient) -> RecordResult<Patient> {
        patient.fiscal_code = patient.normalized_fiscal_code();
        self.ensure_fiscal_code_free(&patient)?;
        self.append(keys::PATIENTS, patient)
    }

    /// Update an existing patient.
    pub fn update_patient(&self, mut patient: Patient) -> RecordResult<Patient> {
        patient.fiscal_code = patient.normalized_fiscal_code();
        self.ensure_fiscal_code_free(&patient)?;
        patient.touch();
        self.replace(keys::PATIENTS, patient.clone())?;
        Ok(patient)
    }

    /// Delete a patient along with their visits and exam requests.
    pub fn delete_patient(&self, id: &str) -> RecordResult<()> {
        self.delete::<Patient>(keys::PATIENTS, id)?;

        let mut visits: Vec<Visit> = self.load(keys::VISITS)?;
        visits.retain(|v| v.patient_id != id);
        self.save(keys::VISITS, &visits)?;

        let mut requests: Vec<ExamRequest> = self.load(keys::EXAM_REQUESTS)?;
        requests.retain(|r| r.patient_id != id);
        self.save(keys::EXAM_REQUESTS, &requests)?;

        tracing::debug!(patient_id = id, "deleted patient and related records");
        Ok(())
    }

    /// Check that no other patient uses this patient's fiscal code.
    fn ensure_fiscal_code_free(&self, patient: &Patient) -> RecordResult<()> {
        let Some(code) = patient.normalized_fiscal_code() else {
            return Ok(());
        };
        if let Some(existing) = self.find_patient_by_fiscal_code(&code)? {
            if existing.id != patient.id {
                return Err(RecordError::Validation(format!(
                    "fiscal code {} already belongs to patient {}",
                    code, existing.id
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn patient_exists(&self, id: &str) -> RecordResult<bool> {
        Ok(self.get_patient(id)?.is_some())
    }
}
