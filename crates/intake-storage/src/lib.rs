//! Intake Storage Library
//!
//! Object-store abstraction for the ingestion pipeline: the [`Storage`] trait and
//! implementations for S3 (and S3-compatible providers), the local filesystem,
//! and process memory.
//!
//! # Storage key format
//!
//! `{category}/{unix_millis}-{random}.{extension}`, e.g.
//! `speaker-photos/1760870400123-9081726354.jpg`.
//!
//! Keys must not be empty, contain `..`, or start with `/`. Key generation and
//! validation are centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use intake_core::StorageBackend;
pub use keys::{generate_storage_key, sanitize_extension, sanitize_filename, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, ObjectInfo, Storage, StorageError, StorageResult};
