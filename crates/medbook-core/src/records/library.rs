//! Document and template operations.

use super::{RecordResult, Records};
use crate::models::{Document, Template};
use crate::store::keys;

impl Records<'_> {
    pub fn list_documents(&self) -> RecordResult<Vec<Document>> {
        self.load(keys::DOCUMENTS)
    }

    pub fn get_document(&self, id: &str) -> RecordResult<Option<Document>> {
        self.get(keys::DOCUMENTS, id)
    }

    pub fn add_document(&self, document: Document) -> RecordResult<Document> {
        self.append(keys::DOCUMENTS, document)
    }

    pub fn delete_document(&self, id: &str) -> RecordResult<()> {
        self.delete::<Document>(keys::DOCUMENTS, id)
    }

    /// Documents expiring on or before `date` (YYYY-MM-DD), soonest first.
    pub fn expiring_documents(&self, date: &str) -> RecordResult<Vec<Document>> {
        let mut expiring: Vec<Document> = self
            .list_documents()?
            .into_iter()
            .filter(|d| d.expires_by(date))
            .collect();
        expiring.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date));
        Ok(expiring)
    }

    pub fn list_templates(&self) -> RecordResult<Vec<Template>> {
        self.load(keys::TEMPLATES)
    }

    /// Templates for a form section, default template first.
    pub fn templates_for(&self, category: &str, section: &str) -> RecordResult<Vec<Template>> {
        let mut templates: Vec<Template> = self
            .list_templates()?
            .into_iter()
            .filter(|t| t.category == category && t.section == section)
            .collect();
        templates.sort_by_key(|t| !t.is_default);
        Ok(templates)
    }

    pub fn add_template(&self, template: Template) -> RecordResult<Template> {
        self.append(keys::TEMPLATES, template)
    }

    pub fn delete_template(&self, id: &str) -> RecordResult<()> {
        self.delete::<Template>(keys::TEMPLATES, id)
    }
}
