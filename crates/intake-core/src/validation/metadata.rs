//! Metadata validation module
//!
//! Caller-supplied metadata is stored as object-store user metadata, which only
//! survives transport as short printable ASCII. Validates:
//! - Key pattern, max length, reserved names
//! - Value length and character set
//! - Key count limits

use std::collections::HashMap;

use crate::error::UploadError;

/// Maximum length for metadata key names (64 characters)
pub const MAX_METADATA_KEY_LENGTH: usize = 64;

/// Maximum length for metadata values (512 bytes)
pub const MAX_METADATA_VALUE_LENGTH: usize = 512;

/// Maximum number of caller-supplied keys (20 keys)
pub const MAX_METADATA_KEYS: usize = 20;

/// Keys the pipeline writes on every object
pub const SYSTEM_METADATA_KEYS: &[&str] = &["category", "original-filename"];

const RESERVED_PREFIX: &str = "intake-";

/// Validate a metadata key name
///
/// Rules:
/// - Letters, digits, underscore, hyphen and dot only
/// - Maximum 64 characters
/// - Not a system key and not under the reserved prefix
pub fn validate_metadata_key(key: &str) -> Result<(), UploadError> {
    if key.is_empty() {
        return Err(UploadError::InvalidMetadata(
            "Metadata key cannot be empty".to_string(),
        ));
    }

    if key.len() > MAX_METADATA_KEY_LENGTH {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata key '{}' exceeds maximum length of {} characters",
            key, MAX_METADATA_KEY_LENGTH
        )));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata key '{}' contains invalid characters. Allowed: letters, digits, underscore (_), hyphen (-), dot (.)",
            key
        )));
    }

    if is_reserved_key(key) {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata key '{}' is reserved",
            key
        )));
    }

    Ok(())
}

/// Check if a key is reserved for pipeline use
pub fn is_reserved_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    lower.starts_with(RESERVED_PREFIX) || SYSTEM_METADATA_KEYS.contains(&lower.as_str())
}

/// Validate a metadata value
pub fn validate_metadata_value(key: &str, value: &str) -> Result<(), UploadError> {
    if value.len() > MAX_METADATA_VALUE_LENGTH {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata value for '{}' exceeds maximum length of {} bytes",
            key, MAX_METADATA_VALUE_LENGTH
        )));
    }

    if !value.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata value for '{}' must be printable ASCII",
            key
        )));
    }

    Ok(())
}

/// Validate a caller-supplied metadata map
pub fn validate_user_metadata(metadata: &HashMap<String, String>) -> Result<(), UploadError> {
    if metadata.len() > MAX_METADATA_KEYS {
        return Err(UploadError::InvalidMetadata(format!(
            "Metadata contains {} keys, but maximum allowed is {}",
            metadata.len(),
            MAX_METADATA_KEYS
        )));
    }

    for (key, value) in metadata {
        validate_metadata_key(key)?;
        validate_metadata_value(key, value)?;
    }

    Ok(())
}
