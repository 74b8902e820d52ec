//! Image encoding: pixel surface → base64 payload for the OCR request body.
//!
//! Rendered pages are PNG-encoded because lossless compression preserves
//! text crispness — JPEG artefacts on rendered glyphs measurably degrade
//! recognition accuracy. Raw image uploads skip re-encoding entirely and are
//! wrapped as-is with their declared type: the engine sees exactly the bytes
//! the applicant uploaded.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A base64-wrapped image ready for the OCR engine.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// Base64 payload (no data-URI prefix).
    pub data: String,
    /// Media type of the encoded bytes.
    pub mime_type: String,
}

/// PNG-encode a rendered page surface.
pub fn encode_surface(img: &DynamicImage) -> Result<EncodedPage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let data = STANDARD.encode(&buf);
    debug!("encoded page surface → {} bytes base64", data.len());

    Ok(EncodedPage {
        data,
        mime_type: "image/png".to_string(),
    })
}

/// Wrap already-encoded raw image bytes (the image extraction path).
pub fn encode_raw(bytes: &[u8], mime_type: Option<&str>) -> EncodedPage {
    EncodedPage {
        data: STANDARD.encode(bytes),
        mime_type: mime_type.unwrap_or("image/png").to_string(),
    }
}
