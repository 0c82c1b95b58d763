//! Heuristic content inspection.
//!
//! All checks work on the buffer decoded as latin1 (one char per byte), so binary
//! content never fails to decode and byte patterns stay searchable as substrings.

use intake_core::{normalize_mime_type, UploadError};
use regex::Regex;
use std::sync::LazyLock;

/// Minimum plausible size for any inspected file
pub const MIN_FILE_SIZE: usize = 100;
/// Minimum plausible size for a PDF
pub const MIN_PDF_SIZE: usize = 1024;
/// More `Exif` markers than this rejects the file
pub const MAX_EXIF_MARKERS: usize = 100;
/// A pattern contributes to the obfuscation score when it occurs more often than this
pub const OBFUSCATION_PATTERN_THRESHOLD: usize = 5;
/// Score at which a file is rejected as obfuscated
pub const OBFUSCATION_SCORE_LIMIT: usize = 3;
pub const MAX_EXTERNAL_REFS: usize = 20;
pub const MAX_EXTERNAL_REFS_MARKUP: usize = 10;

const PDF_ACTIVE_TOKENS: &[&str] = &[
    "/JavaScript",
    "/JS",
    "/Launch",
    "/EmbeddedFile",
    "/OpenAction",
    "/AA",
    "/SubmitForm",
    "/ImportData",
    "/Hide",
];

/// Matched case-insensitively
const IMAGE_ACTIVE_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "onerror=",
    "onload=",
    "<iframe",
    "<object",
    "<embed",
];

/// Types that can carry live markup get the stricter external-reference limit
const MARKUP_TYPES: &[&str] = &[
    "image/svg+xml",
    "text/html",
    "application/xhtml+xml",
    "text/xml",
    "application/xml",
];

static HEX_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\x[0-9A-Fa-f]{2}").expect("valid hex escape regex"));
static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u[0-9A-Fa-f]{4}").expect("valid unicode escape regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InspectionError {
    /// Malformed or truncated content
    #[error("{0}")]
    StructuralInvalid(String),

    /// Content that looks hostile
    #[error("{0}")]
    Suspicious(String),
}

impl From<InspectionError> for UploadError {
    fn from(err: InspectionError) -> Self {
        match err {
            InspectionError::StructuralInvalid(msg) => UploadError::StructuralInvalid(msg),
            InspectionError::Suspicious(msg) => UploadError::SuspiciousContent(msg),
        }
    }
}

/// Pattern-based scanner used as a pre-check, and instead of an antivirus daemon
/// when none is configured.
#[derive(Debug, Clone, Default)]
pub struct ContentInspector;

impl ContentInspector {
    pub fn new() -> Self {
        Self
    }

    /// Structural checks followed by the heuristic rules
    pub fn inspect(
        &self,
        buffer: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<(), InspectionError> {
        self.check_structure(buffer, filename, mime_type)?;
        self.inspect_heuristics(buffer, filename, mime_type)
    }

    /// Format-specific structural checks: minimum size, PDF header, image polyglots.
    pub fn check_structure(
        &self,
        buffer: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<(), InspectionError> {
        let mime = normalize_mime_type(mime_type);
        let is_pdf = mime == "application/pdf";

        let min_size = if is_pdf { MIN_PDF_SIZE } else { MIN_FILE_SIZE };
        if buffer.len() < min_size {
            return Err(InspectionError::StructuralInvalid(format!(
                "File is too small to be valid ({} bytes, minimum {})",
                buffer.len(),
                min_size
            )));
        }

        if is_pdf {
            self.check_pdf(buffer, filename)
        } else if mime.starts_with("image/") {
            self.check_image(buffer, filename)
        } else {
            Ok(())
        }
    }

    fn check_pdf(&self, buffer: &[u8], filename: &str) -> Result<(), InspectionError> {
        if !buffer.starts_with(b"%PDF") {
            return Err(InspectionError::StructuralInvalid(
                "Invalid PDF file: missing %PDF header".to_string(),
            ));
        }

        // Active PDF features are flagged for monitoring only.
        let text = latin1(buffer);
        let found: Vec<&str> = PDF_ACTIVE_TOKENS
            .iter()
            .copied()
            .filter(|token| text.contains(token))
            .collect();
        if !found.is_empty() {
            tracing::warn!(
                filename = %filename,
                tokens = ?found,
                "PDF contains active content markers"
            );
        }

        Ok(())
    }

    fn check_image(&self, buffer: &[u8], filename: &str) -> Result<(), InspectionError> {
        let text = latin1(buffer).to_ascii_lowercase();
        if let Some(marker) = IMAGE_ACTIVE_MARKERS.iter().find(|m| text.contains(*m)) {
            tracing::warn!(
                filename = %filename,
                marker = %marker,
                "Image contains embedded script markup"
            );
            return Err(InspectionError::Suspicious(
                "Image contains embedded script content".to_string(),
            ));
        }
        Ok(())
    }

    /// Frequency-based rules: metadata stuffing, obfuscation, external-reference floods.
    pub fn inspect_heuristics(
        &self,
        buffer: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<(), InspectionError> {
        let text = latin1(buffer);

        let exif_markers = text.matches("Exif").count();
        if exif_markers > MAX_EXIF_MARKERS {
            tracing::warn!(filename = %filename, exif_markers, "Excessive metadata markers");
            return Err(InspectionError::Suspicious(
                "File contains excessive metadata".to_string(),
            ));
        }

        let score = obfuscation_score(&text);
        if score >= OBFUSCATION_SCORE_LIMIT {
            tracing::warn!(filename = %filename, score, "Obfuscated content detected");
            return Err(InspectionError::Suspicious(
                "File contains obfuscated code".to_string(),
            ));
        }

        let external_refs = text.matches("http://").count() + text.matches("https://").count();
        let limit = external_ref_limit(mime_type);
        if external_refs > limit {
            tracing::warn!(
                filename = %filename,
                external_refs,
                limit,
                "Excessive external references"
            );
            return Err(InspectionError::Suspicious(
                "File contains too many external references".to_string(),
            ));
        }

        Ok(())
    }
}

fn latin1(buffer: &[u8]) -> String {
    buffer.iter().map(|&b| b as char).collect()
}

/// Number of distinct obfuscation techniques each seen more than the per-pattern threshold
fn obfuscation_score(text: &str) -> usize {
    let counts = [
        text.matches("eval(").count(),
        text.matches("unescape(").count(),
        text.matches("String.fromCharCode").count(),
        HEX_ESCAPE.find_iter(text).count(),
        UNICODE_ESCAPE.find_iter(text).count(),
    ];
    counts
        .iter()
        .filter(|&&count| count > OBFUSCATION_PATTERN_THRESHOLD)
        .count()
}

fn external_ref_limit(mime_type: &str) -> usize {
    let mime = normalize_mime_type(mime_type);
    if MARKUP_TYPES.contains(&mime.as_str()) {
        MAX_EXTERNAL_REFS_MARKUP
    } else {
        MAX_EXTERNAL_REFS
    }
}
