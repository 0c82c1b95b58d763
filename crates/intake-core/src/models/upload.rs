use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::category::FileCategory;

/// A single upload as received from a caller. Owned by the call that
/// processes it and dropped when that call returns.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub data: Bytes,
    pub declared_mime_type: String,
    pub original_filename: String,
    pub category: FileCategory,
    pub metadata: HashMap<String, String>,
}

impl UploadRequest {
    pub fn new(
        data: impl Into<Bytes>,
        declared_mime_type: impl Into<String>,
        original_filename: impl Into<String>,
        category: FileCategory,
    ) -> Self {
        Self {
            data: data.into(),
            declared_mime_type: declared_mime_type.into(),
            original_filename: original_filename.into(),
            category,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Per-call overrides merged over the category policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadOptions {
    #[serde(default)]
    pub max_size_bytes: Option<u64>,
    #[serde(default)]
    pub allowed_mime_types: Option<Vec<String>>,
    /// `None` keeps the category's setting.
    #[serde(default)]
    pub verify_magic_bytes: Option<bool>,
    #[serde(default = "default_true")]
    pub scan_for_viruses: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_size_bytes: None,
            allowed_mime_types: None,
            verify_magic_bytes: None,
            scan_for_viruses: true,
        }
    }
}

/// Handle returned for a stored file. The key is the only reference used for
/// later retrieval or deletion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub storage_key: String,
    pub url: String,
}

/// Object metadata reported by the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    pub content_type: String,
}

impl FileMetadata {
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";

    pub fn new(size: u64, content_type: Option<String>) -> Self {
        Self {
            size,
            content_type: content_type
                .filter(|ct| !ct.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_CONTENT_TYPE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default_scans() {
        let opts = UploadOptions::default();
        assert!(opts.scan_for_viruses);
        assert!(opts.max_size_bytes.is_none());

        let parsed: UploadOptions = serde_json::from_str("{}").unwrap();
        assert!(parsed.scan_for_viruses);
    }

    #[test]
    fn test_file_metadata_defaults_content_type() {
        assert_eq!(
            FileMetadata::new(10, None).content_type,
            "application/octet-stream"
        );
        assert_eq!(
            FileMetadata::new(10, Some("  ".into())).content_type,
            "application/octet-stream"
        );
        assert_eq!(
            FileMetadata::new(10, Some("image/png".into())).content_type,
            "image/png"
        );
    }

    #[test]
    fn test_request_size_is_buffer_length() {
        let req = UploadRequest::new(vec![0u8; 42], "image/png", "a.png", FileCategory::NewsImages);
        assert_eq!(req.size(), 42);
        assert!(req.metadata.is_empty());
    }
}
