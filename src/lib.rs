//! # scholar-intake
//!
//! The application intake pipeline for a scholarship programme: take an
//! applicant's uploaded identity and academic documents, extract text from
//! them (images or PDFs) via OCR, reconcile the extracted data against a
//! validated multi-step form, and — on submission — anchor a tamper-evident
//! fingerprint of the application to a public ledger for later independent
//! verification.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Kind     resolve {Image, Pdf, Unsupported} once at the boundary
//!  ├─ 2. Render   rasterise PDF pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode   pixel surface → base64 PNG
//!  ├─ 4. OCR      vision engine reads the page, reports [0,1] fractions
//!  ├─ 5. Prefill  scrape name/school/course/GWA into the draft
//!  ├─ 6. Wizard   validated step machine accumulates the draft
//!  └─ 7. Submit   persist the finalized snapshot, then notarize
//! ```
//!
//! ## Partial-failure tolerance
//!
//! The pipeline coordinates three failure-prone externals — the OCR engine,
//! the PDF renderer, and the ledger — and each is fenced off:
//!
//! * extraction **never** errors out of [`DocumentExtractor::extract`];
//!   failures become the `error` string on [`ExtractionResult`] and the
//!   user falls back to manual entry;
//! * the notary **never** raises; every failure is a
//!   [`NotaryOutcome::Skipped`] and submission proceeds;
//! * only persistence failures fail a submission, and those are retryable
//!   with the same immutable [`FinalizedApplication`] snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scholar_intake::{DocumentExtractor, IntakeConfig, UploadedDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IntakeConfig::default();
//!     let extractor = DocumentExtractor::from_config(&config)?;
//!
//!     let bytes = std::fs::read("certificate-of-grades.pdf")?;
//!     let doc = UploadedDocument::new(
//!         bytes,
//!         Some("application/pdf".into()),
//!         Some("certificate-of-grades.pdf".into()),
//!         "certificate-of-grades",
//!     );
//!
//!     let result = extractor.extract(&doc, None).await;
//!     match result.error {
//!         None => println!("{}", result.text),
//!         Some(e) => eprintln!("extraction failed: {e}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `intake` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod notary;
pub mod pipeline;
pub mod prefill;
pub mod progress;
pub mod submit;
pub mod wizard;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{IntakeConfig, IntakeConfigBuilder, LedgerConfig, OcrConfig};
pub use document::{DocumentKind, ExtractionResult, UploadedDocument};
pub use error::{ExtractError, IntakeError, StoreError, SubmitError};
pub use extract::DocumentExtractor;
pub use notary::client::{LedgerRpc, RpcClient};
pub use notary::{Notary, NotaryOutcome, SkipReason};
pub use pipeline::ocr::{HttpOcrEngine, OcrEngine};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use prefill::{suggest_fields, PrefillSuggestions};
pub use progress::{
    ExtractionObserver, ExtractionProgress, NoopObserver, ProgressObserver, ProgressStage,
};
pub use submit::{
    submit_application, ApplicationRecord, ApplicationStatus, ApplicationStore,
    NotarizationRecord, SubmissionReceipt,
};
pub use wizard::{
    ApplicationDraft, ApplicationType, DocumentRef, FinalizedApplication, Step, StepMachine,
    ValidationError,
};
