//! Doctor profile and clinic locations.

use serde::{Deserialize, Serialize};

/// Fixed identity of the placeholder doctor used when none is stored.
pub const PLACEHOLDER_DOCTOR_ID: &str = "doctor-default";
pub const PLACEHOLDER_DOCTOR_NAME: &str = "Nome";
pub const PLACEHOLDER_DOCTOR_SURNAME: &str = "Cognome";
pub const PLACEHOLDER_DOCTOR_EMAIL: &str = "email@example.com";

/// A clinic location where the doctor sees patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Ambulatory {
    pub id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
}

impl Ambulatory {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            address: address.into(),
            city: city.into(),
            ..Default::default()
        }
    }
}

/// Content identity of an ambulatory: lowercased, trimmed name, address and city.
pub fn ambulatory_content_key(entry: &Ambulatory) -> String {
    format!(
        "{}|{}|{}",
        entry.name.trim().to_lowercase(),
        entry.address.trim().to_lowercase(),
        entry.city.trim().to_lowercase()
    )
}

/// The singleton doctor record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    /// Base64 data URL of the profile picture
    pub profile_image: Option<String>,
    pub ambulatories: Vec<Ambulatory>,
    pub created_at: String,
    pub updated_at: String,
}

impl Doctor {
    /// Placeholder used by export when no doctor has been saved yet.
    pub fn placeholder() -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: PLACEHOLDER_DOCTOR_ID.to_string(),
            name: PLACEHOLDER_DOCTOR_NAME.to_string(),
            surname: PLACEHOLDER_DOCTOR_SURNAME.to_string(),
            email: PLACEHOLDER_DOCTOR_EMAIL.to_string(),
            created_at: now.clone(),
            updated_at: now,
            ..Default::default()
        }
    }

    /// The ambulatory flagged primary, if any.
    pub fn primary_ambulatory(&self) -> Option<&Ambulatory> {
        self.ambulatories.iter().find(|a| a.is_primary)
    }

    /// Enforce a single primary ambulatory.
    ///
    /// Keeps the first flagged entry and clears the rest. When nothing is
    /// flagged, `preferred_key` (an [`ambulatory_content_key`]) selects the
    /// entry to promote, falling back to the first one.
    pub fn normalize_primary(&mut self, preferred_key: Option<&str>) {
        if self.ambulatories.is_empty() {
            return;
        }

        let chosen = self
            .ambulatories
            .iter()
            .position(|a| a.is_primary)
            .or_else(|| {
                preferred_key.and_then(|key| {
                    self.ambulatories
                        .iter()
                        .position(|a| ambulatory_content_key(a) == key)
                })
            })
            .unwrap_or(0);

        for (index, ambulatory) in self.ambulatories.iter_mut().enumerate() {
            ambulatory.is_primary = index == chosen;
        }
    }

    /// Touch the updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
