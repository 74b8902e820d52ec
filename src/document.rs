//! Uploaded documents and the extraction result consumed by the form flow.
//!
//! ## Why resolve the kind once?
//!
//! File-type sniffing scattered across the pipeline breeds inconsistency: the
//! renderer and the OCR dispatcher could disagree about what a file is. The
//! kind is therefore resolved exactly once, when the [`UploadedDocument`] is
//! constructed, into the tagged [`DocumentKind`] union that every later stage
//! matches on exhaustively. Declared MIME type wins; the file-name extension
//! is only a fallback for browsers and clients that omit or garble the type.

use serde::{Deserialize, Serialize};

/// The resolved media kind of an uploaded document.
///
/// Every pipeline stage matches on this exhaustively; `Unsupported` carries
/// what was declared so error messages can name the offending type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// A raster image, fed to the OCR engine directly.
    Image,
    /// A PDF, rasterised page by page before OCR.
    Pdf,
    /// Anything else; extraction refuses it immediately.
    Unsupported { declared: String },
}

/// Raster extensions accepted when no usable MIME type was declared.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

/// Resolve the media kind from the declared MIME type, falling back to the
/// file-name extension.
pub fn resolve_kind(mime: Option<&str>, file_name: Option<&str>) -> DocumentKind {
    if let Some(mime) = mime {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == "application/pdf" {
            return DocumentKind::Pdf;
        }
        if mime.starts_with("image/") {
            return DocumentKind::Image;
        }
    }

    if let Some(name) = file_name {
        if let Some(ext) = name.rsplit('.').next().filter(|e| *e != name) {
            let ext = ext.to_ascii_lowercase();
            if ext == "pdf" {
                return DocumentKind::Pdf;
            }
            if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                return DocumentKind::Image;
            }
        }
    }

    DocumentKind::Unsupported {
        declared: mime
            .map(str::to_string)
            .or_else(|| file_name.map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

/// One user-supplied file, owned by the step in which it was uploaded.
///
/// Immutable after construction: a re-upload replaces the whole value rather
/// than mutating it in place, so earlier extraction results can never refer
/// to bytes that changed underneath them.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    mime: Option<String>,
    file_name: Option<String>,
    field_tag: String,
    kind: DocumentKind,
}

impl UploadedDocument {
    /// Construct a document, resolving its [`DocumentKind`] once.
    ///
    /// `field_tag` names the form field the upload belongs to, e.g. `"id"`
    /// or `"certificate-of-grades"`.
    pub fn new(
        bytes: Vec<u8>,
        mime: Option<String>,
        file_name: Option<String>,
        field_tag: impl Into<String>,
    ) -> Self {
        let kind = resolve_kind(mime.as_deref(), file_name.as_deref());
        Self {
            bytes,
            mime,
            file_name,
            field_tag: field_tag.into(),
            kind,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn field_tag(&self) -> &str {
        &self.field_tag
    }

    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }
}

/// Output of the extractor for one document.
///
/// Never constructed with both non-empty text and an error; empty text with
/// no error is a valid outcome (blank scan, no recognisable glyphs). The
/// value is transient — it is consumed immediately to pre-fill form fields
/// and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Extracted plain text, possibly empty.
    pub text: String,
    /// Human-readable failure description, if extraction failed.
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            error: Some(message.into()),
        }
    }

    /// True when the result carries usable text and no error.
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_wins_over_extension() {
        // Declared type takes precedence even when the name disagrees.
        assert_eq!(
            resolve_kind(Some("application/pdf"), Some("scan.png")),
            DocumentKind::Pdf
        );
        assert_eq!(
            resolve_kind(Some("image/jpeg"), Some("grades.pdf")),
            DocumentKind::Image
        );
    }

    #[test]
    fn extension_fallback_when_mime_missing() {
        assert_eq!(resolve_kind(None, Some("id-card.PNG")), DocumentKind::Image);
        assert_eq!(resolve_kind(None, Some("form137.pdf")), DocumentKind::Pdf);
    }

    #[test]
    fn extension_fallback_when_mime_unrecognised() {
        // Some clients send application/octet-stream for everything.
        assert_eq!(
            resolve_kind(Some("application/octet-stream"), Some("scan.jpg")),
            DocumentKind::Image
        );
    }

    #[test]
    fn unknown_inputs_are_unsupported() {
        assert_eq!(
            resolve_kind(Some("text/csv"), None),
            DocumentKind::Unsupported {
                declared: "text/csv".into()
            }
        );
        assert_eq!(
            resolve_kind(None, Some("notes.docx")),
            DocumentKind::Unsupported {
                declared: "notes.docx".into()
            }
        );
        assert_eq!(
            resolve_kind(None, None),
            DocumentKind::Unsupported {
                declared: "unknown".into()
            }
        );
    }

    #[test]
    fn extensionless_name_is_unsupported() {
        assert_eq!(
            resolve_kind(None, Some("README")),
            DocumentKind::Unsupported {
                declared: "README".into()
            }
        );
    }

    #[test]
    fn document_resolves_kind_at_construction() {
        let doc = UploadedDocument::new(vec![1, 2, 3], None, Some("id.jpg".into()), "id");
        assert_eq!(*doc.kind(), DocumentKind::Image);
        assert_eq!(doc.field_tag(), "id");
        assert_eq!(doc.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn usable_result_requires_text_without_error() {
        assert!(ExtractionResult::text("hello").is_usable());
        assert!(!ExtractionResult::text("").is_usable());
        assert!(!ExtractionResult::error("boom").is_usable());
    }
}
