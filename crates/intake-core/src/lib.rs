//! Intake Core Library
//!
//! Domain models, category policies, error types, configuration and metadata
//! validation shared by every stage of the file-ingestion pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, ScannerConfig, StorageConfig};
pub use error::{ErrorKind, ErrorMetadata, LogLevel, UploadError};
pub use models::{
    CleanupOutcome, FileCategory, FileMetadata, ScanOutcome, UploadOptions, UploadRequest,
    UploadResult,
};
pub use policy::{normalize_mime_type, CategoryPolicies, CategoryPolicy};
pub use storage_types::StorageBackend;
