//! End-to-end pipeline tests against scripted fakes.
//!
//! The pdfium renderer and the HTTP OCR engine are replaced with in-process
//! fakes so these tests exercise the orchestration contracts — dispatch,
//! progress arithmetic, all-or-nothing paging, submission ordering — without
//! a native library or a live endpoint.

use async_trait::async_trait;
use image::DynamicImage;
use scholar_intake::error::{ExtractError, StoreError, SubmitError};
use scholar_intake::pipeline::encode::EncodedPage;
use scholar_intake::pipeline::ocr::FractionSink;
use scholar_intake::submit::NotarizationRecord;
use scholar_intake::wizard::{FinalizedApplication, GRADES_DOCUMENT_TAG, ID_DOCUMENT_TAG};
use scholar_intake::{
    submit_application, ApplicationStore, ApplicationType, DocumentExtractor, ExtractionObserver,
    ExtractionProgress, IntakeConfig, LedgerConfig, Notary, OcrEngine, PageRenderer,
    ProgressObserver, ProgressStage, StepMachine, UploadedDocument,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Renderer producing blank surfaces for a fixed page count, optionally
/// failing at one page.
struct FakeRenderer {
    pages: usize,
    fail_at: Option<usize>,
}

impl PageRenderer for FakeRenderer {
    fn page_count(&self, _bytes: &[u8]) -> Result<usize, ExtractError> {
        Ok(self.pages)
    }

    fn render_page(
        &self,
        _bytes: &[u8],
        page_index: usize,
        _scale: f32,
    ) -> Result<DynamicImage, ExtractError> {
        if self.fail_at == Some(page_index) {
            return Err(ExtractError::RenderFailed {
                page: page_index + 1,
                detail: "scripted render failure".into(),
            });
        }
        Ok(DynamicImage::ImageRgb8(image::RgbImage::new(4, 4)))
    }
}

/// Engine that replays a script: per call, a list of progress fractions to
/// emit followed by a result.
struct FakeEngine {
    script: Vec<Result<String, ExtractError>>,
    fractions: Vec<f32>,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn pages(texts: &[&str]) -> Self {
        Self {
            script: texts.iter().map(|t| Ok(t.to_string())).collect(),
            fractions: vec![0.25, 1.0],
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(detail: &str) -> Self {
        Self {
            script: vec![Err(ExtractError::OcrFailed {
                detail: detail.into(),
            })],
            fractions: vec![0.1],
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OcrEngine for FakeEngine {
    async fn recognize(
        &self,
        _page: &EncodedPage,
        _language: &str,
        progress: FractionSink<'_>,
    ) -> Result<String, ExtractError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        for &fraction in &self.fractions {
            progress(fraction);
        }
        self.script
            .get(call)
            .cloned()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Observer that records every event it is pushed.
#[derive(Default)]
struct CollectingObserver {
    events: Mutex<Vec<ExtractionProgress>>,
}

impl ExtractionObserver for CollectingObserver {
    fn on_progress(&self, event: ExtractionProgress) {
        self.events.lock().unwrap().push(event);
    }
}

fn extractor(renderer: FakeRenderer, engine: FakeEngine) -> DocumentExtractor {
    DocumentExtractor::new(
        Arc::new(renderer),
        Arc::new(engine),
        &IntakeConfig::default(),
    )
}

fn pdf_upload(tag: &str) -> UploadedDocument {
    UploadedDocument::new(
        vec![0u8; 64],
        Some("application/pdf".into()),
        Some("doc.pdf".into()),
        tag,
    )
}

// ── Extraction contracts ─────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_upload_fails_fast_with_no_events() {
    let ex = extractor(
        FakeRenderer {
            pages: 1,
            fail_at: None,
        },
        FakeEngine::pages(&["never read"]),
    );
    let doc = UploadedDocument::new(b"PK\x03\x04".to_vec(), None, Some("notes.docx".into()), "id");

    let collector = Arc::new(CollectingObserver::default());
    let result = ex
        .extract(&doc, Some(Arc::clone(&collector) as ProgressObserver))
        .await;

    assert_eq!(result.text, "");
    assert!(result.error.unwrap().starts_with("unsupported file type"));
    assert!(collector.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn image_engine_failure_becomes_a_result_error() {
    let ex = extractor(
        FakeRenderer {
            pages: 0,
            fail_at: None,
        },
        FakeEngine::failing("engine unreachable"),
    );
    let doc = UploadedDocument::new(vec![1u8; 32], Some("image/png".into()), None, "id");

    let result = ex.extract(&doc, None).await;
    assert_eq!(result.text, "");
    assert!(result.error.unwrap().contains("engine unreachable"));
}

#[tokio::test]
async fn image_progress_stays_inside_the_band() {
    let ex = extractor(
        FakeRenderer {
            pages: 0,
            fail_at: None,
        },
        FakeEngine::pages(&["JUAN DELA CRUZ"]),
    );
    let doc = UploadedDocument::new(vec![1u8; 32], Some("image/jpeg".into()), None, "id");

    let collector = Arc::new(CollectingObserver::default());
    let result = ex
        .extract(&doc, Some(Arc::clone(&collector) as ProgressObserver))
        .await;

    assert_eq!(result.text, "JUAN DELA CRUZ");
    let events = collector.events.lock().unwrap();
    assert!(!events.is_empty());
    for event in events.iter() {
        assert_eq!(event.stage, ProgressStage::RecognizingText);
        assert!((1..=99).contains(&event.percent), "got {}", event.percent);
    }
}

#[tokio::test]
async fn multi_page_pdf_joins_pages_and_reports_monotone_progress() {
    let ex = extractor(
        FakeRenderer {
            pages: 3,
            fail_at: None,
        },
        FakeEngine::pages(&["page one", "page two", "page three"]),
    );

    let collector = Arc::new(CollectingObserver::default());
    let result = ex
        .extract(
            &pdf_upload(GRADES_DOCUMENT_TAG),
            Some(Arc::clone(&collector) as ProgressObserver),
        )
        .await;

    assert_eq!(result.error, None);
    assert_eq!(result.text, "page one\npage two\npage three");

    let events = collector.events.lock().unwrap();
    // Each page contributes one rendering event plus the engine's fractions.
    assert_eq!(events.len(), 3 * 3);
    assert_eq!(events[0].stage, ProgressStage::RenderingPage);

    let mut last = 0u8;
    for event in events.iter() {
        assert!((1..=99).contains(&event.percent));
        assert!(
            event.percent >= last,
            "progress regressed: {} after {}",
            event.percent,
            last
        );
        last = event.percent;
    }
    // Page 1 complete is a third of the document.
    assert!(events.iter().any(|e| e.percent == 33));
    // Never reaches 100 from inside the extractor.
    assert_eq!(events.last().unwrap().percent, 99);
}

#[tokio::test]
async fn page_failure_discards_earlier_pages() {
    // Page 2 (index 1) fails to render; pages already recognised are dropped.
    let ex = extractor(
        FakeRenderer {
            pages: 3,
            fail_at: Some(1),
        },
        FakeEngine::pages(&["page one", "page two", "page three"]),
    );

    let result = ex.extract(&pdf_upload(GRADES_DOCUMENT_TAG), None).await;
    assert_eq!(result.text, "");
    let error = result.error.expect("failed page must fail the document");
    assert!(error.contains("page 2"), "got: {error}");
}

#[tokio::test]
async fn zero_page_pdf_is_corrupt() {
    let ex = extractor(
        FakeRenderer {
            pages: 0,
            fail_at: None,
        },
        FakeEngine::pages(&[]),
    );
    let result = ex.extract(&pdf_upload("id"), None).await;
    assert!(result.error.unwrap().contains("no pages"));
}

// ── Submission ordering ──────────────────────────────────────────────────────

#[derive(Default)]
struct InMemoryStore {
    records: Mutex<HashMap<Uuid, String>>,
    attachments: Mutex<Vec<(String, Option<NotarizationRecord>)>>,
    fail_persist: bool,
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn persist(&self, app: &FinalizedApplication) -> Result<String, StoreError> {
        if self.fail_persist {
            return Err(StoreError::Backend("database unavailable".into()));
        }
        let mut records = self.records.lock().unwrap();
        // Resubmission of the same snapshot maps to the same stored id.
        let id = records
            .entry(app.id)
            .or_insert_with(|| app.id.to_string())
            .clone();
        Ok(id)
    }

    async fn attach_notarization(
        &self,
        stored_id: &str,
        record: Option<&NotarizationRecord>,
    ) -> Result<(), StoreError> {
        self.attachments
            .lock()
            .unwrap()
            .push((stored_id.to_string(), record.cloned()));
        Ok(())
    }
}

/// Walk a fresh machine through every step to a finalized snapshot.
fn finalized_application() -> FinalizedApplication {
    let mut m = StepMachine::new();
    m.draft_mut().unwrap().application_type = Some(ApplicationType::New);
    m.advance().unwrap();
    m.draft_mut().unwrap().attach_document(UploadedDocument::new(
        vec![1u8; 8],
        Some("image/png".into()),
        Some("id.png".into()),
        ID_DOCUMENT_TAG,
    ));
    m.advance().unwrap();
    m.draft_mut().unwrap().face_scan_confirmed = true;
    m.advance().unwrap();
    {
        let d = m.draft_mut().unwrap();
        d.full_name = "Juan Dela Cruz".into();
        d.age = "20".into();
        d.address = "Davao City".into();
        d.school = "UP Mindanao".into();
        d.course = "BS Computer Science".into();
        d.year_level = "3rd Year".into();
        d.gwa = "1.50".into();
    }
    m.advance().unwrap();
    m.draft_mut().unwrap().attach_document(UploadedDocument::new(
        vec![2u8; 8],
        Some("application/pdf".into()),
        Some("grades.pdf".into()),
        GRADES_DOCUMENT_TAG,
    ));
    m.advance().unwrap();
    m.finalized().unwrap().clone()
}

fn keyless_notary() -> Notary {
    Notary::new(&LedgerConfig::default()).expect("default ledger config is valid")
}

#[tokio::test]
async fn submission_survives_a_skipped_notarization() {
    let store = InMemoryStore::default();
    let notary = keyless_notary();
    let app = finalized_application();

    let receipt = submit_application(&store, &notary, &app, "user-7")
        .await
        .expect("submission succeeds without a ledger key");

    assert_eq!(receipt.stored_id, app.id.to_string());
    assert!(!receipt.notarization.is_success());
    assert_eq!(receipt.notarization.tx_hash(), None);

    // The skipped outcome is recorded as an explicit absence.
    let attachments = store.attachments.lock().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].0, app.id.to_string());
    assert!(attachments[0].1.is_none());
}

#[tokio::test]
async fn resubmitting_the_same_snapshot_is_idempotent() {
    let store = InMemoryStore::default();
    let notary = keyless_notary();
    let app = finalized_application();

    let first = submit_application(&store, &notary, &app, "user-7")
        .await
        .unwrap();
    let second = submit_application(&store, &notary, &app, "user-7")
        .await
        .unwrap();

    assert_eq!(first.stored_id, second.stored_id);
    assert_eq!(store.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn persistence_failure_aborts_before_notarization() {
    let store = InMemoryStore {
        fail_persist: true,
        ..InMemoryStore::default()
    };
    let notary = keyless_notary();
    let app = finalized_application();

    let err = submit_application(&store, &notary, &app, "user-7")
        .await
        .unwrap_err();
    assert!(matches!(err, SubmitError::Persistence { .. }));
    // Nothing was attached: persist failed first.
    assert!(store.attachments.lock().unwrap().is_empty());
}
