//! Portable backup file format.

use serde::{Deserialize, Serialize};

use crate::models::{Doctor, Document, ExamRequest, Patient, Template, Visit};

/// A full point-in-time export of every collection plus the doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub visits: Vec<Visit>,
    #[serde(rename = "richiesteEsami", default)]
    pub exam_requests: Vec<ExamRequest>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub doctor: Option<Doctor>,
    #[serde(default)]
    pub last_sync: String,
}

impl ExportSnapshot {
    /// Parse a backup file.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Total number of records across all collections (doctor excluded).
    pub fn record_count(&self) -> usize {
        self.patients.len()
            + self.visits.len()
            + self.exam_requests.len()
            + self.documents.len()
            + self.templates.len()
    }
}
