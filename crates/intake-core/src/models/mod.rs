//! Domain models for the ingestion pipeline.

pub mod category;
pub mod scan;
pub mod upload;

pub use category::FileCategory;
pub use scan::{CleanupOutcome, ScanOutcome};
pub use upload::{FileMetadata, UploadOptions, UploadRequest, UploadResult};
