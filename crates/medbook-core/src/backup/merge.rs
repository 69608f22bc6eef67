//! Non-destructive merge of an imported snapshot into the current state.
//!
//! Pure functions only: the caller reads the current state once, merges, and
//! writes the resulting collections back. Existing records are never removed
//! or overwritten; incoming records are deduplicated by id (patients), by
//! fiscal code (patients) or by a content key (everything else), and get a
//! fresh id when theirs is already taken.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::models::{
    ambulatory_content_key, Doctor, Document, ExamRequest, Patient, Record, Template, Visit,
};

use super::snapshot::ExportSnapshot;

/// Counters for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Records appended to the collection
    pub added: usize,
    /// Incoming records already present (same id, fiscal code or content key)
    pub duplicates: usize,
    /// Incoming records dropped because their patient does not exist
    pub orphans: usize,
    /// Appended records whose id was replaced to avoid a collision
    pub reassigned_ids: usize,
}

/// Per-collection outcome of a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub patients: CollectionReport,
    pub visits: CollectionReport,
    pub exam_requests: CollectionReport,
    pub documents: CollectionReport,
    pub templates: CollectionReport,
    /// Whether the doctor record changed
    pub doctor_updated: bool,
}

/// Result of [`merge_snapshots`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Reconciled state. `last_sync` is carried over from the current state.
    pub merged: ExportSnapshot,
    pub report: MergeReport,
}

/// Tracks ids in use and hands out non-colliding ones.
#[derive(Debug, Default)]
pub struct IdPool {
    used: HashSet<String>,
}

impl IdPool {
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            used: ids.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Reserve `candidate`, or a fresh UUID when it is empty or taken.
    pub fn claim(&mut self, candidate: &str) -> String {
        if !candidate.is_empty() && self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }

        loop {
            let id = uuid::Uuid::new_v4().to_string();
            if self.used.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// Dedupe key of a visit: (patient, date, normalized description).
pub fn visit_key(visit: &Visit) -> (String, String, String) {
    (
        visit.patient_id.clone(),
        visit.visit_date.clone(),
        visit.clinical_description.trim().to_lowercase(),
    )
}

/// Dedupe key of an exam request: its whole content except id and timestamps.
pub fn exam_request_key(request: &ExamRequest) -> (String, String, String, String, String) {
    (
        request.patient_id.clone(),
        request.request_date.clone(),
        request.exams.trim().to_lowercase(),
        request.clinical_question.trim().to_lowercase(),
        request
            .notes
            .as_deref()
            .map(|n| n.trim().to_lowercase())
            .unwrap_or_default(),
    )
}

/// Dedupe key of a document: (file name, upload date, size).
pub fn document_key(document: &Document) -> (String, String, u64) {
    (
        document.file_name.clone(),
        document.upload_date.clone(),
        document.file_size,
    )
}

/// Dedupe key of a template: exact content.
pub fn template_key(template: &Template) -> (String, String, String, String) {
    (
        template.category.clone(),
        template.section.clone(),
        template.label.clone(),
        template.text.clone(),
    )
}

/// Merge `incoming` into `current`.
pub fn merge_snapshots(current: &ExportSnapshot, incoming: &ExportSnapshot) -> MergeOutcome {
    let mut report = MergeReport::default();

    let (patients, id_map) =
        merge_patients(&current.patients, &incoming.patients, &mut report.patients);
    let patient_ids: HashSet<&str> = patients.iter().map(|p| p.id.as_str()).collect();

    let incoming_visits = remap_patients(
        &incoming.visits,
        &id_map,
        &patient_ids,
        &mut report.visits,
        |v| &mut v.patient_id,
    );
    let visits = merge_by_content(
        &current.visits,
        incoming_visits,
        visit_key,
        &mut report.visits,
    );

    let incoming_requests = remap_patients(
        &incoming.exam_requests,
        &id_map,
        &patient_ids,
        &mut report.exam_requests,
        |r| &mut r.patient_id,
    );
    let exam_requests = merge_by_content(
        &current.exam_requests,
        incoming_requests,
        exam_request_key,
        &mut report.exam_requests,
    );

    let documents = merge_by_content(
        &current.documents,
        incoming.documents.clone(),
        document_key,
        &mut report.documents,
    );
    let templates = merge_by_content(
        &current.templates,
        incoming.templates.clone(),
        template_key,
        &mut report.templates,
    );

    let doctor = merge_doctor(current.doctor.as_ref(), incoming.doctor.as_ref());
    report.doctor_updated = doctor != current.doctor;

    MergeOutcome {
        merged: ExportSnapshot {
            patients,
            visits,
            exam_requests,
            documents,
            templates,
            doctor,
            last_sync: current.last_sync.clone(),
        },
        report,
    }
}

/// Merge patients, returning the merged list and the incoming-id to final-id map.
pub fn merge_patients(
    current: &[Patient],
    incoming: &[Patient],
    report: &mut CollectionReport,
) -> (Vec<Patient>, HashMap<String, String>) {
    let existing_ids: HashSet<&str> = current.iter().map(|p| p.id.as_str()).collect();
    let mut by_fiscal_code: HashMap<String, String> = HashMap::new();
    for patient in current {
        if let Some(code) = patient.normalized_fiscal_code() {
            by_fiscal_code.entry(code).or_insert_with(|| patient.id.clone());
        }
    }

    let mut ids = IdPool::new(existing_ids.iter().copied());
    let mut merged = current.to_vec();
    let mut id_map: HashMap<String, String> = HashMap::new();

    for patient in incoming {
        if existing_ids.contains(patient.id.as_str()) {
            id_map
                .entry(patient.id.clone())
                .or_insert_with(|| patient.id.clone());
            report.duplicates += 1;
            continue;
        }

        // A repeated id inside one backup is the same patient
        if !patient.id.is_empty() && id_map.contains_key(&patient.id) {
            report.duplicates += 1;
            continue;
        }

        let fiscal_code = patient.normalized_fiscal_code();
        if let Some(existing) = fiscal_code.as_ref().and_then(|c| by_fiscal_code.get(c)) {
            tracing::debug!(
                incoming_id = %patient.id,
                existing_id = %existing,
                "patient already present by fiscal code"
            );
            if !patient.id.is_empty() {
                id_map
                    .entry(patient.id.clone())
                    .or_insert_with(|| existing.clone());
            }
            report.duplicates += 1;
            continue;
        }

        let final_id = ids.claim(&patient.id);
        if final_id != patient.id {
            report.reassigned_ids += 1;
        }

        let mut added = patient.clone();
        added.id = final_id.clone();
        added.fiscal_code = fiscal_code.clone();
        if let Some(code) = fiscal_code {
            by_fiscal_code.insert(code, final_id.clone());
        }
        // An empty id cannot be referenced, so it never enters the map
        if !patient.id.is_empty() {
            id_map.entry(patient.id.clone()).or_insert(final_id);
        }
        merged.push(added);
        report.added += 1;
    }

    (merged, id_map)
}

/// Rewrite patient references through `id_map`, dropping records whose
/// patient does not exist after the patient merge.
fn remap_patients<T, F>(
    incoming: &[T],
    id_map: &HashMap<String, String>,
    patient_ids: &HashSet<&str>,
    report: &mut CollectionReport,
    patient_id: F,
) -> Vec<T>
where
    T: Record + Clone,
    F: Fn(&mut T) -> &mut String,
{
    let mut remapped = Vec::with_capacity(incoming.len());
    for record in incoming {
        let mut record = record.clone();
        let reference = patient_id(&mut record);
        if let Some(mapped) = id_map.get(reference.as_str()) {
            *reference = mapped.clone();
        }

        if !patient_ids.contains(reference.as_str()) {
            tracing::debug!(
                record_id = %record.id(),
                "dropping incoming record without a matching patient"
            );
            report.orphans += 1;
            continue;
        }
        remapped.push(record);
    }
    remapped
}

/// Append incoming records whose content key is not yet present.
fn merge_by_content<T, K, F>(
    current: &[T],
    incoming: Vec<T>,
    key: F,
    report: &mut CollectionReport,
) -> Vec<T>
where
    T: Record + Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen: HashSet<K> = current.iter().map(&key).collect();
    let mut ids = IdPool::new(current.iter().map(|r| r.id()));
    let mut merged = current.to_vec();

    for mut record in incoming {
        if !seen.insert(key(&record)) {
            tracing::debug!(record_id = %record.id(), "skipping duplicate incoming record");
            report.duplicates += 1;
            continue;
        }

        let final_id = ids.claim(record.id());
        if final_id != record.id() {
            report.reassigned_ids += 1;
            record.set_id(final_id);
        }
        merged.push(record);
        report.added += 1;
    }

    merged
}

/// Merge doctor profiles. The current doctor wins on every non-empty field.
pub fn merge_doctor(current: Option<&Doctor>, incoming: Option<&Doctor>) -> Option<Doctor> {
    let (current, incoming) = match (current, incoming) {
        (current, None) => return current.cloned(),
        (None, Some(incoming)) => {
            let mut doctor = incoming.clone();
            doctor.normalize_primary(None);
            return Some(doctor);
        }
        (Some(current), Some(incoming)) => (current, incoming),
    };

    let mut merged = current.clone();
    merged.name = prefer(&current.name, &incoming.name);
    merged.surname = prefer(&current.surname, &incoming.surname);
    merged.email = prefer(&current.email, &incoming.email);
    merged.phone = prefer_opt(&current.phone, &incoming.phone);
    merged.specialty = prefer_opt(&current.specialty, &incoming.specialty);
    merged.profile_image = prefer_opt(&current.profile_image, &incoming.profile_image);

    let mut keys: HashSet<String> = merged
        .ambulatories
        .iter()
        .map(ambulatory_content_key)
        .collect();
    let mut ids = IdPool::new(merged.ambulatories.iter().map(|a| a.id.as_str()));
    for ambulatory in &incoming.ambulatories {
        if keys.insert(ambulatory_content_key(ambulatory)) {
            let mut added = ambulatory.clone();
            added.id = ids.claim(&ambulatory.id);
            merged.ambulatories.push(added);
        }
    }

    let incoming_primary = incoming.primary_ambulatory().map(ambulatory_content_key);
    merged.normalize_primary(incoming_primary.as_deref());
    merged.touch();

    Some(merged)
}

fn prefer(current: &str, incoming: &str) -> String {
    if current.trim().is_empty() {
        incoming.to_string()
    } else {
        current.to_string()
    }
}

fn prefer_opt(current: &Option<String>, incoming: &Option<String>) -> Option<String> {
    match current {
        Some(value) if !value.trim().is_empty() => current.clone(),
        _ => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ambulatory, DocumentCategory};

    fn patient(id: &str, fiscal_code: Option<&str>) -> Patient {
        let mut p = Patient::new("Mario", "Rossi");
        p.id = id.to_string();
        p.fiscal_code = fiscal_code.map(str::to_string);
        p
    }

    fn visit(id: &str, patient_id: &str, date: &str, description: &str) -> Visit {
        let mut v = Visit::new(patient_id, date);
        v.id = id.to_string();
        v.clinical_description = description.to_string();
        v
    }

    #[test]
    fn test_id_pool_claims() {
        let mut pool = IdPool::new(["a", "b"]);
        assert_eq!(pool.claim("c"), "c");
        assert!(pool.contains("c"));

        let fresh = pool.claim("a");
        assert_ne!(fresh, "a");
        assert_eq!(fresh.len(), 36);

        let from_empty = pool.claim("");
        assert!(!from_empty.is_empty());
    }

    #[test]
    fn test_patient_same_id_is_not_overwritten() {
        let current = vec![patient("p1", Some("AAA"))];
        let mut incoming = patient("p1", Some("BBB"));
        incoming.name = "Altro".into();

        let mut report = CollectionReport::default();
        let (merged, id_map) = merge_patients(&current, &[incoming], &mut report);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Mario");
        assert_eq!(id_map["p1"], "p1");
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_patient_dedupe_by_normalized_fiscal_code() {
        let current = vec![patient("p1", Some("RSSMRA80A01H501U"))];
        let incoming = vec![patient("p9", Some(" rssmra80a01h501u "))];

        let mut report = CollectionReport::default();
        let (merged, id_map) = merge_patients(&current, &incoming, &mut report);

        assert_eq!(merged.len(), 1);
        assert_eq!(id_map["p9"], "p1");
    }

    #[test]
    fn test_incoming_duplicates_of_each_other() {
        let incoming = vec![
            patient("p1", Some("CODE")),
            patient("p2", Some("code")),
        ];

        let mut report = CollectionReport::default();
        let (merged, id_map) = merge_patients(&[], &incoming, &mut report);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].fiscal_code.as_deref(), Some("CODE"));
        assert_eq!(id_map["p2"], "p1");
    }

    #[test]
    fn test_repeated_incoming_id_maps_to_first() {
        let current = vec![patient("p1", Some("CODE"))];
        let incoming = vec![patient("p9", Some("code")), patient("p9", None)];

        let mut report = CollectionReport::default();
        let (merged, id_map) = merge_patients(&current, &incoming, &mut report);

        assert_eq!(merged.len(), 1);
        assert_eq!(id_map["p9"], "p1");
        assert_eq!(report.duplicates, 2);
    }

    #[test]
    fn test_new_patient_without_fiscal_code_keeps_id() {
        let current = vec![patient("p1", None)];
        let incoming = vec![patient("p2", None)];

        let mut report = CollectionReport::default();
        let (merged, id_map) = merge_patients(&current, &incoming, &mut report);

        assert_eq!(merged.len(), 2);
        assert_eq!(id_map["p2"], "p2");
        assert_eq!(report.added, 1);
        assert_eq!(report.reassigned_ids, 0);
    }

    #[test]
    fn test_visit_remapped_and_deduplicated() {
        let current = ExportSnapshot {
            patients: vec![patient("p1", Some("RSSMRA80A01H501U"))],
            visits: vec![visit("v1", "p1", "2024-01-10", "Controllo")],
            ..Default::default()
        };
        let incoming = ExportSnapshot {
            patients: vec![patient("p9", Some("RSSMRA80A01H501U"))],
            visits: vec![
                // Same content as v1 once remapped
                visit("v7", "p9", "2024-01-10", "  CONTROLLO "),
                // New visit with a colliding id
                visit("v1", "p9", "2024-02-10", "Febbre"),
            ],
            ..Default::default()
        };

        let outcome = merge_snapshots(&current, &incoming);
        let visits = &outcome.merged.visits;

        assert_eq!(visits.len(), 2);
        assert_eq!(visits[1].patient_id, "p1");
        assert_ne!(visits[1].id, "v1");
        assert_eq!(outcome.report.visits.duplicates, 1);
        assert_eq!(outcome.report.visits.reassigned_ids, 1);
    }

    #[test]
    fn test_empty_patient_id_does_not_adopt_references() {
        let incoming = ExportSnapshot {
            patients: vec![patient("", Some("RSSMRA80A01H501U"))],
            visits: vec![visit("v1", "", "2024-01-10", "x")],
            exam_requests: vec![ExamRequest::new("", "2024-01-10", "Emocromo")],
            ..Default::default()
        };

        let outcome = merge_snapshots(&ExportSnapshot::default(), &incoming);
        assert_eq!(outcome.merged.patients.len(), 1);
        assert!(!outcome.merged.patients[0].id.is_empty());
        assert!(outcome.merged.visits.is_empty());
        assert!(outcome.merged.exam_requests.is_empty());
        assert_eq!(outcome.report.visits.orphans, 1);
        assert_eq!(outcome.report.exam_requests.orphans, 1);
    }

    #[test]
    fn test_orphan_records_dropped() {
        let incoming = ExportSnapshot {
            visits: vec![visit("v1", "ghost", "2024-01-10", "x")],
            exam_requests: vec![ExamRequest::new("ghost", "2024-01-10", "Emocromo")],
            ..Default::default()
        };

        let outcome = merge_snapshots(&ExportSnapshot::default(), &incoming);
        assert!(outcome.merged.visits.is_empty());
        assert!(outcome.merged.exam_requests.is_empty());
        assert_eq!(outcome.report.visits.orphans, 1);
        assert_eq!(outcome.report.exam_requests.orphans, 1);
    }

    #[test]
    fn test_exam_requests_differing_in_question_are_kept() {
        let mut existing = ExamRequest::new("p1", "2024-01-01", "Emocromo");
        existing.clinical_question = "Anemia?".into();
        let current = ExportSnapshot {
            patients: vec![patient("p1", None)],
            exam_requests: vec![existing.clone()],
            ..Default::default()
        };

        let mut other = ExamRequest::new("p1", "2024-01-01", "Emocromo");
        other.clinical_question = "Infezione?".into();
        let mut noted = existing.clone();
        noted.id = "r-noted".into();
        noted.notes = Some("A digiuno".into());
        let incoming = ExportSnapshot {
            exam_requests: vec![other, noted, existing],
            ..Default::default()
        };

        let outcome = merge_snapshots(&current, &incoming);
        assert_eq!(outcome.merged.exam_requests.len(), 3);
        assert_eq!(outcome.report.exam_requests.added, 2);
        assert_eq!(outcome.report.exam_requests.duplicates, 1);
    }

    #[test]
    fn test_document_and_template_dedupe() {
        let mut doc = Document::new("Corso", "x.pdf", 100, DocumentCategory::Course);
        doc.upload_date = "2024-01-01".into();
        let mut retitled = doc.clone();
        retitled.id = "other".into();
        retitled.title = "Renamed".into();

        let template = Template::new("visit", "history", "Normale", "Nulla da segnalare");
        let mut changed = template.clone();
        changed.text = "Altro".into();

        let current = ExportSnapshot {
            documents: vec![doc],
            templates: vec![template.clone()],
            ..Default::default()
        };
        let incoming = ExportSnapshot {
            documents: vec![retitled],
            templates: vec![template, changed],
            ..Default::default()
        };

        let outcome = merge_snapshots(&current, &incoming);
        assert_eq!(outcome.merged.documents.len(), 1);
        assert_eq!(outcome.merged.templates.len(), 2);
        assert_eq!(outcome.report.templates.reassigned_ids, 1);
    }

    #[test]
    fn test_doctor_current_wins_on_non_empty_fields() {
        let mut current = Doctor::placeholder();
        current.name = "Anna".into();
        current.email = "".into();
        current.phone = Some("  ".into());

        let mut incoming = Doctor::placeholder();
        incoming.name = "Giulia".into();
        incoming.email = "giulia@example.com".into();
        incoming.phone = Some("333".into());
        incoming.specialty = Some("Cardiologia".into());

        let merged = merge_doctor(Some(&current), Some(&incoming)).unwrap();
        assert_eq!(merged.name, "Anna");
        assert_eq!(merged.email, "giulia@example.com");
        assert_eq!(merged.phone.as_deref(), Some("333"));
        assert_eq!(merged.specialty.as_deref(), Some("Cardiologia"));
    }

    #[test]
    fn test_doctor_ambulatory_union_keeps_one_primary() {
        let mut current = Doctor::placeholder();
        let mut main = Ambulatory::new("Studio", "Via Roma 1", "Milano");
        main.is_primary = true;
        current.ambulatories = vec![main];

        let mut incoming = Doctor::placeholder();
        let mut other = Ambulatory::new("Clinica", "Via Po 3", "Torino");
        other.is_primary = true;
        incoming.ambulatories = vec![
            Ambulatory::new("studio ", "via roma 1", "MILANO"),
            other,
        ];

        let merged = merge_doctor(Some(&current), Some(&incoming)).unwrap();
        assert_eq!(merged.ambulatories.len(), 2);
        let primaries: Vec<_> = merged.ambulatories.iter().filter(|a| a.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].name, "Studio");
    }

    #[test]
    fn test_doctor_absent_on_either_side() {
        let doctor = Doctor::placeholder();
        assert_eq!(merge_doctor(None, None), None);
        assert_eq!(merge_doctor(Some(&doctor), None), Some(doctor.clone()));

        let merged = merge_doctor(None, Some(&doctor)).unwrap();
        assert_eq!(merged.id, doctor.id);
    }
}
