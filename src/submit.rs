//! Submission orchestration: persist first, notarize after, never the
//! other way round.
//!
//! The ordering invariant is load-bearing: a stored application must exist
//! before its notarization record can reference it. The converse coupling is
//! forbidden — a skipped or failed notarization is a normal, loggable
//! outcome that must never fail the submission.
//!
//! The store itself is an external collaborator behind [`ApplicationStore`];
//! this crate defines the trait and the record shapes it consumes, nothing
//! about how they are persisted. `persist` is required to be idempotent on
//! the application id so a user can safely resubmit the same finalized
//! snapshot after a transient storage failure.

use crate::error::{StoreError, SubmitError};
use crate::notary::{Notary, NotaryOutcome};
use crate::wizard::{ApplicationType, DocumentRef, FinalizedApplication};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Review status of a stored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

/// The record shape the external store consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub application_type: ApplicationType,
    /// Free-form details payload: the validated personal/academic fields.
    pub details: serde_json::Value,
    pub documents: Vec<DocumentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    /// Map a finalized snapshot onto the stored-record shape. New records
    /// always enter as `Pending`.
    pub fn from_finalized(app: &FinalizedApplication) -> Self {
        Self {
            id: app.id,
            status: ApplicationStatus::Pending,
            application_type: app.application_type,
            details: serde_json::json!({
                "full_name": app.full_name,
                "age": app.age,
                "address": app.address,
                "school": app.school,
                "course": app.course,
                "year_level": app.year_level,
                "gwa": app.gwa,
            }),
            documents: app.documents.clone(),
            created_at: app.submitted_at,
            updated_at: app.submitted_at,
        }
    }
}

/// The append-only audit entry for one notarization attempt.
///
/// Created once, after the application is persisted. The transaction fields
/// are present only on success; their absence means notarization was skipped
/// or failed. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotarizationRecord {
    pub application_id: Uuid,
    pub user_id: String,
    /// 0x-prefixed keccak-256 fingerprint, reproducible from the stored
    /// application id, user id, and submission timestamp.
    pub fingerprint: String,
    pub tx_hash: Option<String>,
    pub confirmed: bool,
}

/// The external relational store, specified only at its interface boundary.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Persist a finalized application; returns the stored identifier.
    /// Must be idempotent on `app.id`.
    async fn persist(&self, app: &FinalizedApplication) -> Result<String, StoreError>;

    /// Attach the notarization outcome to an already-stored application.
    /// `None` records that notarization was skipped.
    async fn attach_notarization(
        &self,
        stored_id: &str,
        record: Option<&NotarizationRecord>,
    ) -> Result<(), StoreError>;
}

/// What the caller gets back from a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub stored_id: String,
    pub notarization: NotaryOutcome,
}

/// Submit one finalized application.
///
/// Persistence failures are fatal to this attempt and surfaced as a
/// retryable [`SubmitError`]; the notary outcome, whatever it is, never
/// fails the submission.
pub async fn submit_application(
    store: &dyn ApplicationStore,
    notary: &Notary,
    app: &FinalizedApplication,
    user_id: &str,
) -> Result<SubmissionReceipt, SubmitError> {
    let stored_id = store
        .persist(app)
        .await
        .map_err(|source| SubmitError::Persistence {
            application_id: app.id,
            source,
        })?;
    info!(application_id = %app.id, stored_id, "application persisted");

    let application_id = app.id.to_string();
    let outcome = notary
        .notarize(&application_id, user_id, app.submitted_at)
        .await;

    let record = match &outcome {
        NotaryOutcome::Success { tx_hash } => Some(NotarizationRecord {
            application_id: app.id,
            user_id: user_id.to_string(),
            fingerprint: Notary::fingerprint_hex(&application_id, user_id, app.submitted_at),
            tx_hash: Some(tx_hash.clone()),
            confirmed: true,
        }),
        NotaryOutcome::Skipped { reason } => {
            info!(application_id = %app.id, %reason, "notarization skipped");
            None
        }
    };

    store
        .attach_notarization(&stored_id, record.as_ref())
        .await
        .map_err(|source| {
            warn!(stored_id, %source, "failed to attach notarization record");
            SubmitError::AttachFailed {
                stored_id: stored_id.clone(),
                source,
            }
        })?;

    Ok(SubmissionReceipt {
        stored_id,
        notarization: outcome,
    })
}
