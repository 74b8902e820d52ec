//! Error types for the scholar-intake library.
//!
//! The intake pipeline distinguishes four failure classes, each with its own
//! recovery policy:
//!
//! * [`IntakeError`] — **Fatal setup errors**: the component cannot be
//!   constructed at all (malformed signing key, bad burn address, invalid
//!   endpoint URL). Surfaced once, at startup, from constructors.
//!
//! * [`ExtractError`] — **Per-document errors**: OCR or rendering failed for
//!   one uploaded document. Never propagated as `Err` from the extractor
//!   boundary; converted to the `error` string on
//!   [`crate::document::ExtractionResult`] so the form flow is never
//!   interrupted and the user can retry the upload or fill fields manually.
//!
//! * [`StoreError`] / [`SubmitError`] — **Persistence errors**: the external
//!   application store rejected or dropped a write. Fatal to that submission
//!   attempt but retryable with the same finalized snapshot.
//!
//! Ledger failures are deliberately absent here: the notary absorbs every
//! failure into [`crate::notary::NotaryOutcome::Skipped`] so submission
//! success is never coupled to ledger availability.

use thiserror::Error;

/// Fatal errors raised while constructing or configuring intake components.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Configuration was present but malformed (bad key, address, or URL).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal, per-document extraction failure.
///
/// Converted to a plain message on [`crate::document::ExtractionResult`] at
/// the extractor boundary; the step machine never sees this type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The document is neither an image nor a PDF.
    #[error("unsupported file type: {detail}")]
    UnsupportedKind { detail: String },

    /// The document bytes could not be parsed at all.
    #[error("document is corrupt or unreadable: {detail}")]
    CorruptDocument { detail: String },

    /// A page index beyond the document's page count was requested.
    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Rasterisation failed for a specific page.
    #[error("rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine returned an error or was unreachable.
    #[error("text recognition failed: {detail}")]
    OcrFailed { detail: String },

    /// Unexpected internal error (e.g. a panicked blocking task).
    #[error("internal extraction error: {0}")]
    Internal(String),
}

/// Errors raised by an [`crate::submit::ApplicationStore`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the write.
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// The store holds a conflicting record for this identifier.
    #[error("conflicting record: {0}")]
    Conflict(String),
}

/// Errors returned by [`crate::submit::submit_application`].
///
/// Always retryable: the finalized snapshot is immutable, and stores are
/// required to treat `persist` as idempotent on the application id, so the
/// caller may resubmit the same snapshot without double work.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Persisting the finalized application failed.
    #[error("failed to persist application {application_id}: {source}")]
    Persistence {
        application_id: uuid::Uuid,
        #[source]
        source: StoreError,
    },

    /// The application was stored, but attaching its notarization record failed.
    #[error("failed to attach notarization to stored application {stored_id}: {source}")]
    AttachFailed {
        stored_id: String,
        #[source]
        source: StoreError,
    },
}
