//! Document text extraction: the top-level orchestration.
//!
//! [`DocumentExtractor::extract`] is the pipeline's user-facing entry point.
//! Its contract is deliberately total: it **never** returns an error and
//! never panics — every failure, from an unreadable PDF to an unreachable
//! OCR endpoint, surfaces as the `error` string on
//! [`ExtractionResult`] so the step machine's validation flow is never
//! interrupted by an unhandled fault. The user retries the upload or types
//! the fields by hand.
//!
//! ## Sequential paging
//!
//! Multi-page PDFs are processed strictly one page at a time. Each page is
//! rendered to a full-resolution surface, encoded, recognised, and dropped
//! before the next page is touched, bounding peak memory to a single page.
//! A failure on any page aborts the whole document and discards text from
//! earlier pages — the result is all-or-nothing per document.

use crate::config::IntakeConfig;
use crate::document::{DocumentKind, ExtractionResult, UploadedDocument};
use crate::error::{ExtractError, IntakeError};
use crate::pipeline::encode::{self, EncodedPage};
use crate::pipeline::ocr::{HttpOcrEngine, OcrEngine};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::progress::{
    page_percent, scale_fraction, ExtractionProgress, NoopObserver, ProgressObserver,
    ProgressStage,
};
use image::DynamicImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extracts plain text from uploaded documents.
///
/// Constructed explicitly with its renderer and engine injected; nothing is
/// read from ambient state per call.
pub struct DocumentExtractor {
    renderer: Arc<dyn PageRenderer>,
    engine: Arc<dyn OcrEngine>,
    language: String,
    render_scale: f32,
}

impl DocumentExtractor {
    /// Build an extractor from injected collaborators.
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        engine: Arc<dyn OcrEngine>,
        config: &IntakeConfig,
    ) -> Self {
        Self {
            renderer,
            engine,
            language: config.ocr.language.clone(),
            render_scale: config.render_scale,
        }
    }

    /// Build the production extractor: pdfium renderer + HTTP OCR engine.
    pub fn from_config(config: &IntakeConfig) -> Result<Self, IntakeError> {
        let engine = HttpOcrEngine::new(&config.ocr)?;
        Ok(Self::new(
            Arc::new(PdfiumRenderer::new()),
            Arc::new(engine),
            config,
        ))
    }

    /// Extract text from one uploaded document.
    ///
    /// Dispatches on the document's resolved [`DocumentKind`]. Progress
    /// events are pushed into `observer` while work is in flight; an
    /// unsupported document produces its error immediately with no events.
    pub async fn extract(
        &self,
        doc: &UploadedDocument,
        observer: Option<ProgressObserver>,
    ) -> ExtractionResult {
        let observer = observer.unwrap_or_else(|| Arc::new(NoopObserver));

        let outcome = match doc.kind() {
            DocumentKind::Unsupported { declared } => {
                debug!(field = doc.field_tag(), declared, "rejecting unsupported upload");
                Err(ExtractError::UnsupportedKind {
                    detail: declared.clone(),
                })
            }
            DocumentKind::Image => self.extract_image(doc, &observer).await,
            DocumentKind::Pdf => self.extract_pdf(doc, &observer).await,
        };

        match outcome {
            Ok(text) => {
                info!(
                    field = doc.field_tag(),
                    bytes = text.len(),
                    "extraction complete"
                );
                ExtractionResult { text, error: None }
            }
            Err(e) => {
                warn!(field = doc.field_tag(), error = %e, "extraction failed");
                ExtractionResult::error(e.to_string())
            }
        }
    }

    /// Image path: feed the raw upload bytes to the engine directly.
    async fn extract_image(
        &self,
        doc: &UploadedDocument,
        observer: &ProgressObserver,
    ) -> Result<String, ExtractError> {
        let page = encode::encode_raw(doc.bytes(), doc.mime());
        self.recognize_page(&page, observer, move |fraction| ExtractionProgress {
            stage: ProgressStage::RecognizingText,
            percent: scale_fraction(fraction),
        })
        .await
    }

    /// PDF path: sequential page loop with the overall-percentage formula.
    async fn extract_pdf(
        &self,
        doc: &UploadedDocument,
        observer: &ProgressObserver,
    ) -> Result<String, ExtractError> {
        let bytes: Arc<Vec<u8>> = Arc::new(doc.bytes().to_vec());
        let total = self.page_count(Arc::clone(&bytes)).await?;
        if total == 0 {
            return Err(ExtractError::CorruptDocument {
                detail: "document has no pages".into(),
            });
        }
        debug!(pages = total, "starting PDF extraction");

        let mut page_texts: Vec<String> = Vec::with_capacity(total);

        for index in 0..total {
            let page_num = index + 1;

            observer.on_progress(ExtractionProgress {
                stage: ProgressStage::RenderingPage,
                percent: page_percent(page_num, total, 0.0),
            });

            let encoded = {
                // The surface lives only inside this block; it is encoded and
                // dropped before recognition starts, and long before the next
                // page is rendered.
                let surface = self.render_page(Arc::clone(&bytes), index).await?;
                encode::encode_surface(&surface).map_err(|e| ExtractError::RenderFailed {
                    page: page_num,
                    detail: format!("surface encoding failed: {e}"),
                })?
            };

            let text = self
                .recognize_page(&encoded, observer, move |fraction| ExtractionProgress {
                    stage: ProgressStage::RecognizingText,
                    percent: page_percent(page_num, total, fraction),
                })
                .await?;

            page_texts.push(text);
        }

        Ok(page_texts.join("\n").trim().to_string())
    }

    /// Run one recognition call, translating engine fractions to UI events.
    async fn recognize_page(
        &self,
        page: &EncodedPage,
        observer: &ProgressObserver,
        to_event: impl Fn(f32) -> ExtractionProgress + Send + Sync,
    ) -> Result<String, ExtractError> {
        let observer = Arc::clone(observer);
        let sink = move |fraction: f32| observer.on_progress(to_event(fraction));
        self.engine.recognize(page, &self.language, &sink).await
    }

    async fn page_count(&self, bytes: Arc<Vec<u8>>) -> Result<usize, ExtractError> {
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.page_count(&bytes))
            .await
            .map_err(|e| ExtractError::Internal(format!("page-count task panicked: {e}")))?
    }

    async fn render_page(
        &self,
        bytes: Arc<Vec<u8>>,
        index: usize,
    ) -> Result<DynamicImage, ExtractError> {
        let renderer = Arc::clone(&self.renderer);
        let scale = self.render_scale;
        tokio::task::spawn_blocking(move || renderer.render_page(&bytes, index, scale))
            .await
            .map_err(|e| ExtractError::Internal(format!("render task panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::FractionSink;
    use async_trait::async_trait;

    /// Engine that must never be reached.
    struct UnreachableEngine;

    #[async_trait]
    impl OcrEngine for UnreachableEngine {
        async fn recognize(
            &self,
            _page: &EncodedPage,
            _language: &str,
            _progress: FractionSink<'_>,
        ) -> Result<String, ExtractError> {
            panic!("engine must not be called for unsupported documents");
        }
    }

    struct UnreachableRenderer;

    impl PageRenderer for UnreachableRenderer {
        fn page_count(&self, _bytes: &[u8]) -> Result<usize, ExtractError> {
            panic!("renderer must not be called for unsupported documents");
        }

        fn render_page(
            &self,
            _bytes: &[u8],
            _page_index: usize,
            _scale: f32,
        ) -> Result<DynamicImage, ExtractError> {
            panic!("renderer must not be called for unsupported documents");
        }
    }

    #[tokio::test]
    async fn unsupported_document_short_circuits() {
        let extractor = DocumentExtractor::new(
            Arc::new(UnreachableRenderer),
            Arc::new(UnreachableEngine),
            &IntakeConfig::default(),
        );
        let doc = UploadedDocument::new(vec![0u8; 8], Some("text/plain".into()), None, "id");

        let result = extractor.extract(&doc, None).await;
        assert_eq!(result.text, "");
        let error = result.error.expect("unsupported must produce an error");
        assert!(error.starts_with("unsupported file type"), "got: {error}");
    }
}
