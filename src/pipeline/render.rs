//! PDF rasterisation: render one page at a time to a `DynamicImage`.
//!
//! ## Why a trait seam?
//!
//! The renderer is one of the three failure-prone externals the pipeline
//! coordinates. Putting it behind [`PageRenderer`] lets the extractor's
//! orchestration (progress math, all-or-nothing aborts, sequential paging)
//! be tested with a scripted fake, while the production [`PdfiumRenderer`]
//! is exercised by environment-gated integration tests that need a pdfium
//! library on disk.
//!
//! ## Why one page at a time?
//!
//! Each page is rendered to a full-resolution pixel surface before being
//! discarded, so peak memory is bounded by a single page regardless of
//! document length. The extractor drops every surface before requesting the
//! next page.

use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Renders PDF pages to pixel surfaces.
///
/// Implementations are called from `spawn_blocking`; they may block freely
/// but must not assume a Tokio context.
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document, or [`ExtractError::CorruptDocument`].
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractError>;

    /// Rasterise the 0-indexed `page_index` at `scale`× document points.
    fn render_page(
        &self,
        bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, ExtractError>;
}

/// Production renderer backed by pdfium.
///
/// The pdfium binding is re-established per call rather than held open;
/// acceptable for a low-frequency consumer like form uploads.
#[derive(Debug, Default)]
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self
    }

    fn load<'a>(&self, pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, ExtractError> {
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ExtractError::CorruptDocument {
                detail: format!("{e:?}"),
            })
    }
}

impl PageRenderer for PdfiumRenderer {
    fn page_count(&self, bytes: &[u8]) -> Result<usize, ExtractError> {
        let pdfium = Pdfium::default();
        let document = self.load(&pdfium, bytes)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        bytes: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, ExtractError> {
        let pdfium = Pdfium::default();
        let document = self.load(&pdfium, bytes)?;
        let pages = document.pages();
        let total = pages.len() as usize;

        if page_index >= total {
            return Err(ExtractError::PageOutOfRange {
                page: page_index + 1,
                total,
            });
        }

        let page = pages
            .get(page_index as u16)
            .map_err(|e| ExtractError::RenderFailed {
                page: page_index + 1,
                detail: format!("{e:?}"),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractError::RenderFailed {
                page: page_index + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "rendered page {} → {}x{} px",
            page_index + 1,
            image.width(),
            image.height()
        );

        // `bitmap` and `document` drop here; the pixel surface returned is
        // the only allocation that outlives this call.
        Ok(image)
    }
}
