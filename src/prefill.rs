//! Form pre-fill: reconcile extracted document text against draft fields.
//!
//! OCR output from IDs and grade certificates is noisy, so pre-fill is
//! strictly a convenience layer: it scrapes labelled lines out of the text
//! and *suggests* values. Suggestions overwrite the draft last-write-wins
//! but never bypass the step machine's validation — a bad scrape is caught
//! by the same guard that catches a typo.

use crate::wizard::ApplicationDraft;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:full\s+)?name\s*[:\-]\s*(.+?)\s*$").unwrap());

static SCHOOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:school|university|college)\s*[:\-]\s*(.+?)\s*$").unwrap()
});

static COURSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:course|program|degree)\s*[:\-]\s*(.+?)\s*$").unwrap());

static YEAR_LEVEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([1-5](?:st|nd|rd|th)\s+year)\b").unwrap());

static GWA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:GWA|general\s+weighted\s+average)\s*[:\-]?\s*([1-5](?:\.\d{1,3})?)\b")
        .unwrap()
});

/// Values scraped from extracted text. `None` means "no confident match";
/// the corresponding draft field is left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefillSuggestions {
    pub full_name: Option<String>,
    pub school: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<String>,
    pub gwa: Option<String>,
}

impl PrefillSuggestions {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.school.is_none()
            && self.course.is_none()
            && self.year_level.is_none()
            && self.gwa.is_none()
    }
}

/// Scrape field suggestions out of extracted plain text.
pub fn suggest_fields(text: &str) -> PrefillSuggestions {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    PrefillSuggestions {
        full_name: capture(&NAME_RE),
        school: capture(&SCHOOL_RE),
        course: capture(&COURSE_RE),
        year_level: capture(&YEAR_LEVEL_RE),
        gwa: capture(&GWA_RE),
    }
}

/// Apply suggestions to the draft, last-write-wins: only present suggestions
/// overwrite, and a later manual edit wins over any earlier pre-fill.
pub fn apply(draft: &mut ApplicationDraft, suggestions: &PrefillSuggestions) {
    if let Some(v) = &suggestions.full_name {
        draft.full_name = v.clone();
    }
    if let Some(v) = &suggestions.school {
        draft.school = v.clone();
    }
    if let Some(v) = &suggestions.course {
        draft.course = v.clone();
    }
    if let Some(v) = &suggestions.year_level {
        draft.year_level = v.clone();
    }
    if let Some(v) = &suggestions.gwa {
        draft.gwa = v.clone();
    }
}
