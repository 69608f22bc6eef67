//! Visit and supplemental exam request models.

use serde::{Deserialize, Serialize};

use super::Record;

/// A clinical visit belonging to a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Visit {
    pub id: String,
    /// Owning patient id
    pub patient_id: String,
    /// Visit date (YYYY-MM-DD)
    pub visit_date: String,
    pub clinical_description: String,
    /// Anamnesis
    pub history: String,
    /// Objective examination
    pub examination: String,
    pub conclusions: String,
    pub therapies: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Visit {
    /// Create a new visit for a patient.
    pub fn new(patient_id: impl Into<String>, visit_date: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            visit_date: visit_date.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Default::default()
        }
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

impl Record for Visit {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// A request for supplemental exams (wire name `richiesteEsami`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExamRequest {
    pub id: String,
    pub patient_id: String,
    /// Request date (YYYY-MM-DD)
    pub request_date: String,
    /// Requested exams, as written on the request
    pub exams: String,
    /// Diagnostic question motivating the request
    pub clinical_question: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ExamRequest {
    /// Create a new exam request for a patient.
    pub fn new(
        patient_id: impl Into<String>,
        request_date: impl Into<String>,
        exams: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            request_date: request_date.into(),
            exams: exams.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Default::default()
        }
    }
}

impl Record for ExamRequest {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
