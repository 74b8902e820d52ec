//! Progress reporting for long-running extractions.
//!
//! The extractor is the producer: it pushes [`ExtractionProgress`] events
//! into an [`ExtractionObserver`] the caller injects per extraction call.
//! The consumer (a UI layer, a progress bar, a websocket) drains them however
//! it likes — the library knows nothing about how the host communicates.
//! There is no shared mutable progress variable anywhere.
//!
//! ## The 1–99 band
//!
//! Reported percentages are clamped to `[1, 99]`: 0 and 100 are reserved for
//! "not started" and "done", which the caller infers from the future itself.
//! An instantaneous recognition would otherwise flash 0 → 100 and back as the
//! next page starts, which reads as flicker in a UI.
//!
//! A caller that abandons the flow simply drops its handle and ignores late
//! events; stale delivery after abandonment is acceptable, but stale text
//! must never be applied to a newer document (the caller's responsibility).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Which phase of extraction the event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressStage {
    /// A PDF page is being rasterised.
    RenderingPage,
    /// The OCR engine is reading text.
    RecognizingText,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStage::RenderingPage => write!(f, "rendering page"),
            ProgressStage::RecognizingText => write!(f, "recognizing text"),
        }
    }
}

/// A transient progress event.
///
/// Within one extraction the percentage is non-decreasing, except that it may
/// reset to a new baseline when multi-page work begins the next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProgress {
    pub stage: ProgressStage,
    /// Always within `[1, 99]` while extraction is in flight.
    pub percent: u8,
}

/// Receives progress events pushed by the extractor.
///
/// Implementations must be `Send + Sync`; rendering runs on a blocking
/// thread while recognition runs on the async runtime, so events can arrive
/// from either. The method has a default no-op body so observers only
/// override what they care about.
pub trait ExtractionObserver: Send + Sync {
    fn on_progress(&self, event: ExtractionProgress) {
        let _ = event;
    }
}

/// A no-op observer for callers that don't need progress events.
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {}

/// Convenience alias for the injected observer handle.
pub type ProgressObserver = Arc<dyn ExtractionObserver>;

/// Scale an engine-internal fraction in `[0, 1]` to a UI percentage.
///
/// Non-finite or out-of-range fractions are clamped rather than rejected;
/// the engine's progress stream is advisory, never load-bearing.
pub fn scale_fraction(fraction: f32) -> u8 {
    let fraction = if fraction.is_finite() { fraction } else { 0.0 };
    let pct = (fraction.clamp(0.0, 1.0) * 100.0).round() as i64;
    pct.clamp(1, 99) as u8
}

/// Overall percentage for page `page` (1-indexed) of `total`, with the
/// engine `fraction` of that page complete:
/// `clamp(round(((page - 1 + fraction) / total) * 100), 1, 99)`.
pub fn page_percent(page: usize, total: usize, fraction: f32) -> u8 {
    if total == 0 {
        return 1;
    }
    let fraction = if fraction.is_finite() { fraction } else { 0.0 };
    let done = (page.saturating_sub(1)) as f64 + f64::from(fraction.clamp(0.0, 1.0));
    let pct = ((done / total as f64) * 100.0).round() as i64;
    pct.clamp(1, 99) as u8
}
