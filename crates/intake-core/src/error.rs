//! Error types module
//!
//! Every failure the ingestion pipeline can surface is an [`UploadError`]. Each
//! variant maps to one [`ErrorKind`] and self-describes how it is presented to a
//! caller through [`ErrorMetadata`]. Client-caused kinds carry a specific message;
//! infrastructure kinds keep their detail for logs and expose a generic message.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Message returned whenever scanning could not reach a verdict.
pub const SCAN_FAILED_MESSAGE: &str = "File scanning failed, try again or contact support";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected rejections like validation failures
    Debug,
    /// Rejections worth monitoring
    Warn,
    /// Unexpected infrastructure failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "SIZE_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether the same request may succeed if retried
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details must stay out of client responses
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Error taxonomy of the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyFile,
    SizeExceeded,
    UnsupportedType,
    ContentMismatch,
    StructuralInvalid,
    SuspiciousContent,
    InvalidMetadata,
    ScanInfrastructureFailure,
    StorageFailure,
}

impl ErrorKind {
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ErrorKind::ScanInfrastructureFailure | ErrorKind::StorageFailure
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ErrorKind::EmptyFile => "EmptyFile",
            ErrorKind::SizeExceeded => "SizeExceeded",
            ErrorKind::UnsupportedType => "UnsupportedType",
            ErrorKind::ContentMismatch => "ContentMismatch",
            ErrorKind::StructuralInvalid => "StructuralInvalid",
            ErrorKind::SuspiciousContent => "SuspiciousContent",
            ErrorKind::InvalidMetadata => "InvalidMetadata",
            ErrorKind::ScanInfrastructureFailure => "ScanInfrastructureFailure",
            ErrorKind::StorageFailure => "StorageFailure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("File is empty")]
    EmptyFile,

    #[error("File size exceeds maximum allowed size of {limit}")]
    SizeExceeded {
        size: u64,
        max_bytes: u64,
        /// Human-readable limit, e.g. `5MB`
        limit: String,
    },

    #[error("Invalid file type. Allowed types: {allowed}")]
    UnsupportedType { mime_type: String, allowed: String },

    #[error("File content does not match declared type {declared}")]
    ContentMismatch { declared: String },

    #[error("{0}")]
    StructuralInvalid(String),

    #[error("{0}")]
    SuspiciousContent(String),

    #[error("File contains malicious content ({signature})")]
    MalwareDetected { signature: String },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Scan infrastructure failure: {0}")]
    ScanInfrastructureFailure(String),

    #[error("Storage {operation} failed: {detail}")]
    StorageFailure {
        operation: &'static str,
        detail: String,
    },
}

impl UploadError {
    pub fn storage(operation: &'static str, detail: impl Into<String>) -> Self {
        UploadError::StorageFailure {
            operation,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::EmptyFile => ErrorKind::EmptyFile,
            UploadError::SizeExceeded { .. } => ErrorKind::SizeExceeded,
            UploadError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            UploadError::ContentMismatch { .. } => ErrorKind::ContentMismatch,
            UploadError::StructuralInvalid(_) => ErrorKind::StructuralInvalid,
            UploadError::SuspiciousContent(_) | UploadError::MalwareDetected { .. } => {
                ErrorKind::SuspiciousContent
            }
            UploadError::InvalidMetadata(_) => ErrorKind::InvalidMetadata,
            UploadError::ScanInfrastructureFailure(_) => ErrorKind::ScanInfrastructureFailure,
            UploadError::StorageFailure { .. } => ErrorKind::StorageFailure,
        }
    }
}

/// Static metadata for each kind: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn kind_static_metadata(
    kind: ErrorKind,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match kind {
        ErrorKind::EmptyFile => (
            400,
            "EMPTY_FILE",
            false,
            Some("Select a non-empty file"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::SizeExceeded => (
            413,
            "SIZE_EXCEEDED",
            false,
            Some("Reduce file size and try again"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::UnsupportedType => (
            400,
            "UNSUPPORTED_TYPE",
            false,
            Some("Upload one of the allowed file types"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::ContentMismatch => (
            400,
            "CONTENT_MISMATCH",
            false,
            Some("Check that the file extension matches its contents"),
            false,
            LogLevel::Warn,
        ),
        ErrorKind::StructuralInvalid => (
            400,
            "STRUCTURAL_INVALID",
            false,
            Some("Re-export the file and try again"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::SuspiciousContent => (
            400,
            "SUSPICIOUS_CONTENT",
            false,
            Some("Upload a different file"),
            false,
            LogLevel::Warn,
        ),
        ErrorKind::InvalidMetadata => (
            400,
            "INVALID_METADATA",
            false,
            Some("Check metadata keys and values"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::ScanInfrastructureFailure => (
            503,
            "SCAN_FAILED",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        ErrorKind::StorageFailure => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for UploadError {
    fn http_status_code(&self) -> u16 {
        kind_static_metadata(self.kind()).0
    }

    fn error_code(&self) -> &'static str {
        kind_static_metadata(self.kind()).1
    }

    fn is_recoverable(&self) -> bool {
        kind_static_metadata(self.kind()).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        kind_static_metadata(self.kind()).3
    }

    fn is_sensitive(&self) -> bool {
        kind_static_metadata(self.kind()).4
    }

    fn log_level(&self) -> LogLevel {
        kind_static_metadata(self.kind()).5
    }

    fn client_message(&self) -> String {
        match self {
            UploadError::ScanInfrastructureFailure(_) => SCAN_FAILED_MESSAGE.to_string(),
            UploadError::StorageFailure { operation, .. } => match *operation {
                "sign" => "Failed to generate file URL".to_string(),
                "head" | "get" => "Failed to retrieve file".to_string(),
                _ => "Failed to store file".to_string(),
            },
            other => other.to_string(),
        }
    }
}
