//! Shared key generation and validation for storage backends.
//!
//! Key format: `{category}/{unix_millis}-{random}.{extension}`.

use crate::traits::{StorageError, StorageResult};
use chrono::Utc;
use intake_core::FileCategory;
use rand::Rng;

/// Extension used when the original filename has none we can keep.
pub const FALLBACK_EXTENSION: &str = "bin";

const MAX_FILENAME_LENGTH: usize = 255;
const MAX_EXTENSION_LENGTH: usize = 16;

/// Generate a fresh storage key for an upload.
///
/// The key never embeds the caller-supplied filename, only its sanitized extension,
/// so user input cannot influence the object path.
pub fn generate_storage_key(category: FileCategory, original_filename: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix: u64 = rand::rng().random();
    format!(
        "{}/{}-{}.{}",
        category.as_str(),
        timestamp,
        suffix,
        sanitize_extension(original_filename)
    )
}

/// Lower-case extension of `filename` with everything outside `[a-z0-9]` removed.
///
/// Only the last path component is considered. Falls back to [`FALLBACK_EXTENSION`]
/// when the name has no extension, nothing survives, or the result is implausibly long.
pub fn sanitize_extension(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let extension = match base.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => return FALLBACK_EXTENSION.to_string(),
    };

    let sanitized: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if sanitized.is_empty() || sanitized.len() > MAX_EXTENSION_LENGTH {
        FALLBACK_EXTENSION.to_string()
    } else {
        sanitized
    }
}

/// Reduce a caller-supplied filename to a safe ASCII form for object metadata.
///
/// Directory components are dropped and any character outside `[A-Za-z0-9._-]`
/// becomes `_`. Names containing `..` or too short to be meaningful become `file`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    if base.contains("..") {
        return "file".to_string();
    }

    let sanitized: String = base
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('_').is_empty() || sanitized.len() < 3 {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Reject keys that are empty, absolute, or contain traversal sequences.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.trim().is_empty() {
        return Err(StorageError::InvalidKey(
            "Storage key must not be empty".to_string(),
        ));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
