//! Documents and text templates kept by the doctor.

use serde::{Deserialize, Serialize};

use super::Record;

/// Document category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    /// Training course attendance
    Course,
    /// Certificate (e.g. specialization, CME)
    Certificate,
    #[default]
    Other,
}

/// An uploaded document with its base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    pub mime_type: String,
    pub category: DocumentCategory,
    pub upload_date: String,
    pub expiry_date: Option<String>,
    /// CME credits
    pub credits: Option<f64>,
    /// Base64-encoded file content
    pub file_data: String,
}

impl Document {
    /// Create a new document uploaded today.
    pub fn new(
        title: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        category: DocumentCategory,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            file_name: file_name.into(),
            file_size,
            category,
            upload_date: chrono::Utc::now().date_naive().to_string(),
            ..Default::default()
        }
    }

    /// Whether the document expires on or before `date` (YYYY-MM-DD).
    pub fn expires_by(&self, date: &str) -> bool {
        self.expiry_date
            .as_deref()
            .map(|expiry| !expiry.is_empty() && expiry <= date)
            .unwrap_or(false)
    }
}

impl Record for Document {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// A reusable text snippet for a form section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    pub id: String,
    /// Form the template belongs to (e.g. "visit", "examRequest")
    pub category: String,
    /// Section within the form (e.g. "history", "therapies")
    pub section: String,
    pub label: String,
    pub text: String,
    pub note: Option<String>,
    pub is_default: bool,
}

impl Template {
    pub fn new(
        category: impl Into<String>,
        section: impl Into<String>,
        label: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.into(),
            section: section.into(),
            label: label.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}

impl Record for Template {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}
