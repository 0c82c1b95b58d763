use crate::signatures::{check_signature, SignatureCheck};
use intake_core::{normalize_mime_type, CategoryPolicy, UploadError};
use std::path::Path;

/// Validation errors for uploaded files
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty file")]
    EmptyFile,

    #[error("File too large: {size} bytes (max: {limit})")]
    FileTooLarge { size: u64, max: u64, limit: String },

    #[error("Invalid content type: {content_type} (allowed: {allowed})")]
    InvalidContentType {
        content_type: String,
        allowed: String,
    },

    #[error("Content does not match declared type {declared}")]
    ContentMismatch { declared: String },
}

impl From<ValidationError> for UploadError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyFile => UploadError::EmptyFile,
            ValidationError::FileTooLarge { size, max, limit } => UploadError::SizeExceeded {
                size,
                max_bytes: max,
                limit,
            },
            ValidationError::InvalidContentType {
                content_type,
                allowed,
            } => UploadError::UnsupportedType {
                mime_type: content_type,
                allowed,
            },
            ValidationError::ContentMismatch { declared } => {
                UploadError::ContentMismatch { declared }
            }
        }
    }
}

/// Upload validator for one resolved category policy
///
/// Checks run in a fixed order and stop at the first failure: emptiness, size,
/// MIME whitelist, then (if the policy asks for it) magic bytes.
pub struct FileValidator {
    policy: CategoryPolicy,
}

impl FileValidator {
    pub fn new(policy: CategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CategoryPolicy {
        &self.policy
    }

    /// Validate file size
    pub fn validate_file_size(&self, buffer: &[u8], size: u64) -> Result<(), ValidationError> {
        if buffer.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.policy.max_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.policy.max_size_bytes,
                limit: self.policy.max_size_display(),
            });
        }

        Ok(())
    }

    /// Validate content type against the category whitelist
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !self.policy.allows(content_type) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.policy.allowed_type_names(),
            });
        }

        Ok(())
    }

    /// Check that the buffer's leading bytes corroborate the declared type
    pub fn validate_magic_bytes(
        &self,
        buffer: &[u8],
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let normalized = normalize_mime_type(content_type);
        match check_signature(buffer, &normalized) {
            SignatureCheck::Match => Ok(()),
            SignatureCheck::NoOpinion => {
                tracing::debug!(
                    content_type = %normalized,
                    "No magic-byte signature registered, skipping content check"
                );
                Ok(())
            }
            SignatureCheck::Mismatch => {
                tracing::warn!(
                    content_type = %normalized,
                    size_bytes = buffer.len(),
                    "File content does not match declared content type"
                );
                Err(ValidationError::ContentMismatch {
                    declared: normalized,
                })
            }
        }
    }

    /// Run every check in order
    pub fn validate(
        &self,
        buffer: &[u8],
        content_type: &str,
        size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_file_size(buffer, size)?;
        self.validate_content_type(content_type)?;
        if self.policy.verify_magic_bytes {
            self.validate_magic_bytes(buffer, content_type)?;
        }
        Ok(())
    }
}

/// Best-effort content type for a filename, used when no type was declared
pub fn content_type_from_extension(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::{FileCategory, UploadOptions};

    const MB: u64 = 1024 * 1024;

    fn jpeg(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        data
    }

    fn png(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..8].copy_from_slice(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        data
    }

    fn validator(category: FileCategory) -> FileValidator {
        FileValidator::new(CategoryPolicy::default_for(category))
    }

    #[test]
    fn test_empty_file() {
        let v = validator(FileCategory::SpeakerPhotos);
        assert_eq!(v.validate(&[], "image/jpeg", 0), Err(ValidationError::EmptyFile));
    }

    #[test]
    fn test_size_boundary_for_every_category() {
        for category in FileCategory::ALL {
            let v = validator(category);
            let max = v.policy().max_size_bytes;
            let mime = v.policy().allowed_mime_types[0].clone();
            let buffer = match mime.as_str() {
                "application/pdf" => b"%PDF-1.7".to_vec(),
                "image/png" => png(16),
                _ => jpeg(16),
            };

            assert!(v.validate(&buffer, &mime, max).is_ok(), "{category}");
            match v.validate(&buffer, &mime, max + 1) {
                Err(ValidationError::FileTooLarge { limit, .. }) => {
                    assert_eq!(limit, v.policy().max_size_display());
                }
                other => panic!("{category}: expected FileTooLarge, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_size_message_mentions_megabytes() {
        let v = validator(FileCategory::SpeakerPhotos);
        let err: UploadError = v.validate(&jpeg(16), "image/jpeg", 5 * MB + 1).unwrap_err().into();
        assert_eq!(err.to_string(), "File size exceeds maximum allowed size of 5MB");
    }

    #[test]
    fn test_type_not_whitelisted() {
        let v = validator(FileCategory::LegalDocuments);
        let err = v.validate(&png(64), "image/png", 64).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidContentType {
                content_type: "image/png".to_string(),
                allowed: "PDF".to_string(),
            }
        );

        let err: UploadError = validator(FileCategory::SpeakerPhotos)
            .validate(b"GIF89a", "image/gif", 6)
            .unwrap_err()
            .into();
        assert_eq!(
            err.to_string(),
            "Invalid file type. Allowed types: JPEG, PNG, WEBP"
        );
    }

    #[test]
    fn test_png_declared_as_jpeg() {
        let v = validator(FileCategory::SpeakerPhotos);
        assert_eq!(
            v.validate(&png(64), "image/jpeg", 64),
            Err(ValidationError::ContentMismatch {
                declared: "image/jpeg".to_string()
            })
        );
        assert!(v.validate(&png(64), "image/png", 64).is_ok());
    }

    #[test]
    fn test_magic_check_can_be_disabled() {
        let policy = CategoryPolicy::default_for(FileCategory::SpeakerPhotos).with_options(
            &UploadOptions {
                verify_magic_bytes: Some(false),
                ..Default::default()
            },
        );
        let v = FileValidator::new(policy);
        assert!(v.validate(&png(64), "image/jpeg", 64).is_ok());
    }

    #[test]
    fn test_declared_type_is_normalized() {
        let v = validator(FileCategory::SponsorLogos);
        assert!(v.validate(&png(64), "Image/PNG; charset=binary", 64).is_ok());
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_from_extension("photo.JPG"), Some("image/jpeg"));
        assert_eq!(content_type_from_extension("terms.pdf"), Some("application/pdf"));
        assert_eq!(content_type_from_extension("archive.7z"), None);
        assert_eq!(content_type_from_extension("README"), None);
    }
}
