//! The application assembly step machine.
//!
//! One applicant, one draft, one strictly linear walk:
//!
//! ```text
//! TypeSelection → IdUpload → FaceScan → PersonalInfo → DocumentUpload → Finalized
//! ```
//!
//! Advancing out of a step requires that step's validation predicate to
//! pass; a failed guard leaves the machine exactly where it was and returns
//! the same field-level messages on every retry. The only legal non-forward
//! move is one step back, which never clears data entered in later steps —
//! a user correcting an earlier field keeps all later work (last-write-wins
//! per field).
//!
//! Entering the terminal `Finalized` state snapshots the draft exactly once
//! into an immutable [`FinalizedApplication`], the hand-off artifact for
//! [`crate::submit::submit_application`].
//!
//! The machine assumes a single-user, single-threaded interaction surface:
//! one active draft per session, no concurrent mutation.

use crate::document::UploadedDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Field tag for the identity document upload.
pub const ID_DOCUMENT_TAG: &str = "id";
/// Field tag for the academic grades upload.
pub const GRADES_DOCUMENT_TAG: &str = "certificate-of-grades";

/// New application or renewal of an existing scholarship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationType {
    New,
    Renewal,
}

/// The ordered form stages. `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    TypeSelection,
    IdUpload,
    FaceScan,
    PersonalInfo,
    DocumentUpload,
    Finalized,
}

impl Step {
    fn next(self) -> Option<Step> {
        match self {
            Step::TypeSelection => Some(Step::IdUpload),
            Step::IdUpload => Some(Step::FaceScan),
            Step::FaceScan => Some(Step::PersonalInfo),
            Step::PersonalInfo => Some(Step::DocumentUpload),
            Step::DocumentUpload => Some(Step::Finalized),
            Step::Finalized => None,
        }
    }

    fn prev(self) -> Option<Step> {
        match self {
            Step::TypeSelection => None,
            Step::IdUpload => Some(Step::TypeSelection),
            Step::FaceScan => Some(Step::IdUpload),
            Step::PersonalInfo => Some(Step::FaceScan),
            Step::DocumentUpload => Some(Step::PersonalInfo),
            // Terminal: the snapshot is already taken and immutable.
            Step::Finalized => None,
        }
    }
}

/// A field-level validation failure. Stable across retries so rejected
/// advances are idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The accumulating draft. All personal/academic fields stay strings until
/// validated by their step's guard.
#[derive(Debug, Clone, Default)]
pub struct ApplicationDraft {
    pub application_type: Option<ApplicationType>,
    pub full_name: String,
    pub age: String,
    pub address: String,
    pub school: String,
    pub course: String,
    pub year_level: String,
    pub gwa: String,
    pub face_scan_confirmed: bool,
    documents: HashMap<String, UploadedDocument>,
}

impl ApplicationDraft {
    /// Attach an upload under its field tag, replacing any previous upload
    /// for that tag wholesale.
    pub fn attach_document(&mut self, doc: UploadedDocument) {
        debug!(field = doc.field_tag(), bytes = doc.bytes().len(), "attaching document");
        self.documents.insert(doc.field_tag().to_string(), doc);
    }

    pub fn document(&self, field_tag: &str) -> Option<&UploadedDocument> {
        self.documents.get(field_tag)
    }

    pub fn documents(&self) -> impl Iterator<Item = &UploadedDocument> {
        self.documents.values()
    }
}

/// Reference to an uploaded document inside a finalized snapshot.
///
/// The snapshot carries references, not bytes: the raw upload is handed to
/// the store separately and the snapshot only needs enough to identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub field_tag: String,
    pub file_name: Option<String>,
    pub byte_len: usize,
}

/// The immutable snapshot produced when every step's guard has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedApplication {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub application_type: ApplicationType,
    pub full_name: String,
    pub age: String,
    pub address: String,
    pub school: String,
    pub course: String,
    pub year_level: String,
    pub gwa: String,
    pub documents: Vec<DocumentRef>,
}

impl FinalizedApplication {
    fn snapshot(draft: &ApplicationDraft) -> Self {
        let mut documents: Vec<DocumentRef> = draft
            .documents
            .values()
            .map(|d| DocumentRef {
                field_tag: d.field_tag().to_string(),
                file_name: d.file_name().map(str::to_string),
                byte_len: d.bytes().len(),
            })
            .collect();
        documents.sort_by(|a, b| a.field_tag.cmp(&b.field_tag));

        Self {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            // Guard guarantees the type was selected before this point.
            application_type: draft.application_type.unwrap_or(ApplicationType::New),
            full_name: draft.full_name.clone(),
            age: draft.age.clone(),
            address: draft.address.clone(),
            school: draft.school.clone(),
            course: draft.course.clone(),
            year_level: draft.year_level.clone(),
            gwa: draft.gwa.clone(),
            documents,
        }
    }
}

/// The step machine driving one application session.
pub struct StepMachine {
    step: Step,
    draft: ApplicationDraft,
    finalized: Option<FinalizedApplication>,
}

impl Default for StepMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StepMachine {
    pub fn new() -> Self {
        Self {
            step: Step::TypeSelection,
            draft: ApplicationDraft::default(),
            finalized: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    /// Mutable access to the draft for field entry and uploads.
    ///
    /// Once finalized the draft is frozen; the snapshot is the authority and
    /// further edits are refused.
    pub fn draft_mut(&mut self) -> Option<&mut ApplicationDraft> {
        if self.step == Step::Finalized {
            None
        } else {
            Some(&mut self.draft)
        }
    }

    /// The snapshot, once `Finalized` has been entered.
    pub fn finalized(&self) -> Option<&FinalizedApplication> {
        self.finalized.as_ref()
    }

    /// Try to advance one step. On guard failure the state is unchanged and
    /// the same errors are returned on every retry.
    pub fn advance(&mut self) -> Result<Step, Vec<ValidationError>> {
        let errors = self.validate_current();
        if !errors.is_empty() {
            debug!(step = ?self.step, failures = errors.len(), "advance rejected");
            return Err(errors);
        }

        if let Some(next) = self.step.next() {
            self.step = next;
            if next == Step::Finalized && self.finalized.is_none() {
                let snapshot = FinalizedApplication::snapshot(&self.draft);
                info!(application_id = %snapshot.id, "application finalized");
                self.finalized = Some(snapshot);
            }
        }
        Ok(self.step)
    }

    /// Go back one step without clearing any later-entered data. No-op at
    /// the first step and at the terminal step.
    pub fn back(&mut self) -> Step {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
        }
        self.step
    }

    fn validate_current(&self) -> Vec<ValidationError> {
        let d = &self.draft;
        let mut errors = Vec::new();

        match self.step {
            Step::TypeSelection => {
                if d.application_type.is_none() {
                    errors.push(ValidationError::new(
                        "application_type",
                        "select a new application or a renewal",
                    ));
                }
            }
            Step::IdUpload => {
                if d.document(ID_DOCUMENT_TAG).is_none() {
                    errors.push(ValidationError::new(
                        "id",
                        "upload a photo or scan of a valid ID",
                    ));
                }
            }
            Step::FaceScan => {
                if !d.face_scan_confirmed {
                    errors.push(ValidationError::new(
                        "face_scan",
                        "complete the face scan before continuing",
                    ));
                }
            }
            Step::PersonalInfo => {
                require(&mut errors, "full_name", &d.full_name, "enter your full name");
                match d.age.trim().parse::<u8>() {
                    Ok(age) if (10..=100).contains(&age) => {}
                    _ => errors.push(ValidationError::new(
                        "age",
                        "age must be a number between 10 and 100",
                    )),
                }
                require(&mut errors, "address", &d.address, "enter your address");
                require(&mut errors, "school", &d.school, "enter your school");
                require(&mut errors, "course", &d.course, "enter your course");
                require(
                    &mut errors,
                    "year_level",
                    &d.year_level,
                    "enter your year level",
                );
                match d.gwa.trim().parse::<f32>() {
                    Ok(gwa) if (1.0..=5.0).contains(&gwa) => {}
                    _ => errors.push(ValidationError::new(
                        "gwa",
                        "GWA must be a number between 1.0 and 5.0",
                    )),
                }
            }
            Step::DocumentUpload => {
                if d.document(GRADES_DOCUMENT_TAG).is_none() {
                    errors.push(ValidationError::new(
                        "certificate-of-grades",
                        "upload your certificate of grades",
                    ));
                }
            }
            Step::Finalized => {}
        }

        errors
    }
}

fn require(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(tag: &str) -> UploadedDocument {
        UploadedDocument::new(vec![0u8; 16], Some("image/png".into()), None, tag)
    }

    fn fill_personal_info(draft: &mut ApplicationDraft) {
        draft.full_name = "Maria Santos".into();
        draft.age = "19".into();
        draft.address = "Quezon City".into();
        draft.school = "PUP".into();
        draft.course = "BS Accountancy".into();
        draft.year_level = "2nd Year".into();
        draft.gwa = "1.75".into();
    }

    /// Drive a fresh machine to just before finalization.
    fn machine_at_document_upload() -> StepMachine {
        let mut m = StepMachine::new();
        m.draft_mut().unwrap().application_type = Some(ApplicationType::New);
        m.advance().unwrap();
        m.draft_mut().unwrap().attach_document(upload(ID_DOCUMENT_TAG));
        m.advance().unwrap();
        m.draft_mut().unwrap().face_scan_confirmed = true;
        m.advance().unwrap();
        fill_personal_info(m.draft_mut().unwrap());
        m.advance().unwrap();
        m.draft_mut()
            .unwrap()
            .attach_document(upload(GRADES_DOCUMENT_TAG));
        m
    }

    #[test]
    fn rejected_advance_is_idempotent_and_keeps_state() {
        let mut m = StepMachine::new();
        let first = m.advance().unwrap_err();
        let second = m.advance().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(m.step(), Step::TypeSelection);
    }

    #[test]
    fn cannot_skip_steps() {
        let mut m = StepMachine::new();
        m.draft_mut().unwrap().application_type = Some(ApplicationType::Renewal);
        assert_eq!(m.advance().unwrap(), Step::IdUpload);
        // Still at IdUpload: no ID attached yet.
        let errors = m.advance().unwrap_err();
        assert_eq!(errors[0].field, "id");
        assert_eq!(m.step(), Step::IdUpload);
    }

    #[test]
    fn personal_info_validation_names_every_bad_field() {
        let mut m = StepMachine::new();
        m.draft_mut().unwrap().application_type = Some(ApplicationType::New);
        m.advance().unwrap();
        m.draft_mut().unwrap().attach_document(upload(ID_DOCUMENT_TAG));
        m.advance().unwrap();
        m.draft_mut().unwrap().face_scan_confirmed = true;
        m.advance().unwrap();

        {
            let d = m.draft_mut().unwrap();
            fill_personal_info(d);
            d.age = "two hundred".into();
            d.gwa = "9.9".into();
        }
        let errors = m.advance().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["age", "gwa"]);
    }

    #[test]
    fn full_walk_yields_exactly_one_snapshot() {
        let mut m = machine_at_document_upload();
        assert!(m.finalized().is_none());
        assert_eq!(m.advance().unwrap(), Step::Finalized);

        let id = m.finalized().unwrap().id;
        // Advancing at the terminal step is a no-op and keeps the snapshot.
        assert_eq!(m.advance().unwrap(), Step::Finalized);
        assert_eq!(m.finalized().unwrap().id, id);

        let app = m.finalized().unwrap();
        assert_eq!(app.full_name, "Maria Santos");
        assert_eq!(app.gwa, "1.75");
        assert_eq!(app.documents.len(), 2);
        assert_eq!(app.documents[0].field_tag, GRADES_DOCUMENT_TAG);
        assert_eq!(app.documents[1].field_tag, ID_DOCUMENT_TAG);
    }

    #[test]
    fn going_back_preserves_later_work_and_last_write_wins() {
        let mut m = machine_at_document_upload();

        // Walk back to PersonalInfo and correct a field.
        assert_eq!(m.back(), Step::PersonalInfo);
        m.draft_mut().unwrap().gwa = "1.50".into();

        // Later work (the grades upload) survived the detour.
        assert_eq!(m.advance().unwrap(), Step::DocumentUpload);
        assert!(m.draft().document(GRADES_DOCUMENT_TAG).is_some());

        assert_eq!(m.advance().unwrap(), Step::Finalized);
        assert_eq!(m.finalized().unwrap().gwa, "1.50");
    }

    #[test]
    fn back_saturates_at_first_step_and_terminal_step() {
        let mut m = StepMachine::new();
        assert_eq!(m.back(), Step::TypeSelection);

        let mut m = machine_at_document_upload();
        m.advance().unwrap();
        assert_eq!(m.back(), Step::Finalized);
        // Frozen: the draft can no longer be edited.
        assert!(m.draft_mut().is_none());
    }

    #[test]
    fn reupload_replaces_document_wholesale() {
        let mut d = ApplicationDraft::default();
        d.attach_document(upload(ID_DOCUMENT_TAG));
        let replacement =
            UploadedDocument::new(vec![9u8; 4], Some("image/jpeg".into()), None, ID_DOCUMENT_TAG);
        d.attach_document(replacement);
        let stored = d.document(ID_DOCUMENT_TAG).unwrap();
        assert_eq!(stored.bytes(), &[9u8; 4]);
        assert_eq!(d.documents().count(), 1);
    }
}
