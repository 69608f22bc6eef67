//! Visit and exam request operations.

use super::{RecordError, RecordResult, Records};
use crate::models::{ExamRequest, Visit};
use crate::store::keys;

impl Records<'_> {
    pub fn list_visits(&self) -> RecordResult<Vec<Visit>> {
        self.load(keys::VISITS)
    }

    pub fn get_visit(&self, id: &str) -> RecordResult<Option<Visit>> {
        self.get(keys::VISITS, id)
    }

    /// Visits of one patient, most recent first.
    pub fn visits_for_patient(&self, patient_id: &str) -> RecordResult<Vec<Visit>> {
        let mut visits: Vec<Visit> = self
            .list_visits()?
            .into_iter()
            .filter(|v| v.patient_id == patient_id)
            .collect();
        visits.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        Ok(visits)
    }

    /// Insert a visit for an existing patient.
    pub fn add_visit(&self, visit: Visit) -> RecordResult<Visit> {
        self.ensure_patient(&visit.patient_id)?;
        self.append(keys::VISITS, visit)
    }

    pub fn update_visit(&self, mut visit: Visit) -> RecordResult<Visit> {
        self.ensure_patient(&visit.patient_id)?;
        visit.touch();
        self.replace(keys::VISITS, visit.clone())?;
        Ok(visit)
    }

    pub fn delete_visit(&self, id: &str) -> RecordResult<()> {
        self.delete::<Visit>(keys::VISITS, id)
    }

    pub fn list_exam_requests(&self) -> RecordResult<Vec<ExamRequest>> {
        self.load(keys::EXAM_REQUESTS)
    }

    /// Exam requests of one patient, most recent first.
    pub fn exam_requests_for_patient(&self, patient_id: &str) -> RecordResult<Vec<ExamRequest>> {
        let mut requests: Vec<ExamRequest> = self
            .list_exam_requests()?
            .into_iter()
            .filter(|r| r.patient_id == patient_id)
            .collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    /// Insert an exam request for an existing patient.
    pub fn add_exam_request(&self, request: ExamRequest) -> RecordResult<ExamRequest> {
        self.ensure_patient(&request.patient_id)?;
        self.append(keys::EXAM_REQUESTS, request)
    }

    pub fn delete_exam_request(&self, id: &str) -> RecordResult<()> {
        self.delete::<ExamRequest>(keys::EXAM_REQUESTS, id)
    }

    fn ensure_patient(&self, patient_id: &str) -> RecordResult<()> {
        if self.patient_exists(patient_id)? {
            Ok(())
        } else {
            Err(RecordError::Validation(format!(
                "patient {} does not exist",
                patient_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use crate::store::MemoryStore;

    #[test]
    fn test_visit_requires_patient() {
        let store = MemoryStore::new();
        let records = Records::new(&store);

        let err = records
            .add_visit(Visit::new("ghost", "2024-01-01"))
            .unwrap_err();
        assert!(matches!(err, RecordError::Validation(_)));
    }

    #[test]
    fn test_visits_for_patient_sorted() {
        let store = MemoryStore::new();
        let records = Records::new(&store);
        let patient = records.add_patient(Patient::new("Mario", "Rossi")).unwrap();

        records.add_visit(Visit::new(patient.id.clone(), "2024-01-01")).unwrap();
        records.add_visit(Visit::new(patient.id.clone(), "2024-03-01")).unwrap();
        records.add_visit(Visit::new(patient.id.clone(), "2024-02-01")).unwrap();

        let dates: Vec<_> = records
            .visits_for_patient(&patient.id)
            .unwrap()
            .into_iter()
            .map(|v| v.visit_date)
            .collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-02-01", "2024-01-01"]);
    }

    #[test]
    fn test_update_and_delete_visit() {
        let store = MemoryStore::new();
        let records = Records::new(&store);
        let patient = records.add_patient(Patient::new("Mario", "Rossi")).unwrap();

        let mut visit = records
            .add_visit(Visit::new(patient.id.clone(), "2024-01-01"))
            .unwrap();
        visit.conclusions = "Guarito".into();
        records.update_visit(visit.clone()).unwrap();
        assert_eq!(
            records.get_visit(&visit.id).unwrap().unwrap().conclusions,
            "Guarito"
        );

        records.delete_visit(&visit.id).unwrap();
        assert!(records.get_visit(&visit.id).unwrap().is_none());
        assert!(matches!(
            records.delete_visit(&visit.id),
            Err(RecordError::NotFound(_))
        ));
    }

    #[test]
    fn test_exam_requests_for_patient() {
        let store = MemoryStore::new();
        let records = Records::new(&store);
        let patient = records.add_patient(Patient::new("Mario", "Rossi")).unwrap();

        let request = records
            .add_exam_request(ExamRequest::new(patient.id.clone(), "2024-01-01", "Emocromo"))
            .unwrap();
        assert_eq!(records.exam_requests_for_patient(&patient.id).unwrap().len(), 1);

        records.delete_exam_request(&request.id).unwrap();
        assert!(records.exam_requests_for_patient(&patient.id).unwrap().is_empty());
    }
}
