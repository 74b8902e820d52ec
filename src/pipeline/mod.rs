//! Pipeline stages for document text extraction.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap
//! implementations (e.g. a fake renderer in tests) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! kind ──▶ render ──▶ encode ──▶ ocr
//! (tagged   (pdfium,   (base64    (vision engine,
//!  union)    PDF only)  PNG)       reports [0,1] fractions)
//! ```
//!
//! 1. [`render`] — rasterise one PDF page at a time; runs in
//!    `spawn_blocking` because pdfium is not async-safe. Skipped entirely
//!    for image uploads.
//! 2. [`encode`] — PNG-encode and base64-wrap the pixel surface for the
//!    OCR request body.
//! 3. [`ocr`]    — drive the recognition call; the only stage with network
//!    I/O, and the only one that emits engine-internal progress fractions.

pub mod encode;
pub mod ocr;
pub mod render;
