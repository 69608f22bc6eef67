//! Patient models.

use serde::{Deserialize, Serialize};

use super::Record;

/// A patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    /// Local UUID
    pub id: String,
    /// Italian fiscal code (codice fiscale), unique when present
    pub fiscal_code: Option<String>,
    /// First name
    pub name: String,
    /// Family name
    pub surname: String,
    /// Date of birth (YYYY-MM-DD)
    pub birth_date: String,
    /// Place of birth
    pub birthplace: String,
    /// Sex as entered ("M", "F")
    pub sex: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last update timestamp
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            surname: surname.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Default::default()
        }
    }

    /// Builder-style setter for the fiscal code.
    pub fn with_fiscal_code(mut self, fiscal_code: impl Into<String>) -> Self {
        self.fiscal_code = Some(fiscal_code.into());
        self
    }

    /// Normalized fiscal code, `None` when absent or blank.
    pub fn normalized_fiscal_code(&self) -> Option<String> {
        self.fiscal_code.as_deref().and_then(normalize_fiscal_code)
    }

    /// "Surname Name" as shown in lists.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.surname, self.name).trim().to_string()
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

impl Record for Patient {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Trim and uppercase a fiscal code. Blank codes normalize to `None`.
pub fn normalize_fiscal_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_uppercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
