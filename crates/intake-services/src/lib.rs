//! Intake Services Layer
//!
//! Orchestration for the ingestion pipeline: the ClamAV socket client, the
//! fail-safe [`VirusScanner`] and the [`StorageOrchestrator`] that callers use to
//! upload, fetch, sign and delete files. Re-exports the storage and processing
//! types callers need so a single dependency on this crate is enough.

pub mod services;

pub use intake_processing::{ContentInspector, FileValidator};
pub use intake_storage::{create_storage, Storage, StorageBackend, StorageError, StorageResult};
pub use services::clamav::{ClamavClient, ClamdError, NoOpScanClient, VirusScanClient};
pub use services::scanner::VirusScanner;
pub use services::upload::StorageOrchestrator;
