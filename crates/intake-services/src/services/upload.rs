//! Upload orchestration: validate → scan → store.

use crate::services::scanner::VirusScanner;
use anyhow::Context;
use intake_core::validation::validate_user_metadata;
use intake_core::{
    normalize_mime_type, CategoryPolicies, CleanupOutcome, Config, FileMetadata, UploadError,
    UploadOptions, UploadRequest, UploadResult,
};
use intake_processing::FileValidator;
use intake_storage::{
    create_storage, generate_storage_key, sanitize_filename, ByteStream, Storage,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const CATEGORY_METADATA_KEY: &str = "category";
pub const FILENAME_METADATA_KEY: &str = "original-filename";

const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);

/// Entry point for file ingestion and the follow-up operations on stored files.
#[derive(Clone)]
pub struct StorageOrchestrator {
    storage: Arc<dyn Storage>,
    scanner: VirusScanner,
    policies: CategoryPolicies,
    signed_url_ttl: Duration,
}

impl StorageOrchestrator {
    pub fn new(storage: Arc<dyn Storage>, scanner: VirusScanner, policies: CategoryPolicies) -> Self {
        Self {
            storage,
            scanner,
            policies,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
        }
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// Build the storage backend and scanner described by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage = create_storage(&config.storage)
            .await
            .context("Failed to initialize storage backend")?;
        let scanner = VirusScanner::from_config(&config.scanner);

        tracing::info!(
            backend = %storage.backend_type(),
            scan_engine = scanner.engine(),
            "Storage orchestrator initialized"
        );

        Ok(Self::new(storage, scanner, config.categories.clone())
            .with_signed_url_ttl(config.storage.signed_url_ttl()))
    }

    pub fn policies(&self) -> &CategoryPolicies {
        &self.policies
    }

    /// Validate, scan and store one file.
    ///
    /// Nothing is written to storage unless every check passed.
    pub async fn upload(
        &self,
        request: UploadRequest,
        options: UploadOptions,
    ) -> Result<UploadResult, UploadError> {
        let start = Instant::now();
        let category = request.category;
        let size = request.size();
        let policy = self.policies.resolve(category, &options);

        validate_user_metadata(&request.metadata)?;

        FileValidator::new(policy)
            .validate(&request.data, &request.declared_mime_type, size)
            .inspect_err(|e| {
                tracing::warn!(
                    category = %category,
                    filename = %request.original_filename,
                    size_bytes = size,
                    error = %e,
                    "Upload failed validation"
                );
            })?;

        let content_type = normalize_mime_type(&request.declared_mime_type);

        if options.scan_for_viruses {
            self.scanner
                .scan_file(request.data.clone(), &request.original_filename, &content_type)
                .await?;
        } else {
            tracing::debug!(
                filename = %request.original_filename,
                "Virus scan skipped for this upload"
            );
        }

        let storage_key = generate_storage_key(category, &request.original_filename);

        let mut metadata: HashMap<String, String> = request.metadata;
        metadata.insert(CATEGORY_METADATA_KEY.to_string(), category.to_string());
        metadata.insert(
            FILENAME_METADATA_KEY.to_string(),
            sanitize_filename(&request.original_filename),
        );

        self.storage
            .put_object(&storage_key, request.data, &content_type, &metadata)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    key = %storage_key,
                    size_bytes = size,
                    "Failed to store uploaded file"
                );
                UploadError::storage("put", e.to_string())
            })?;

        let url = self.storage.public_url(&storage_key);

        tracing::info!(
            key = %storage_key,
            category = %category,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File uploaded"
        );

        Ok(UploadResult { storage_key, url })
    }

    /// Best-effort delete. Never fails; a failure is logged and reported as `Attempted`.
    pub async fn delete(&self, storage_key: &str) -> CleanupOutcome {
        match self.storage.delete_object(storage_key).await {
            Ok(()) => {
                tracing::info!(key = %storage_key, "File deleted");
                CleanupOutcome::Deleted
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %storage_key,
                    "Failed to delete file from storage"
                );
                CleanupOutcome::Attempted {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Temporary GET URL; `None` uses the configured default lifetime.
    pub async fn get_signed_url(
        &self,
        storage_key: &str,
        expires_in: Option<Duration>,
    ) -> Result<String, UploadError> {
        let ttl = expires_in.unwrap_or(self.signed_url_ttl);
        self.storage
            .sign_get_url(storage_key, ttl)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %storage_key, "Failed to sign file URL");
                UploadError::storage("sign", e.to_string())
            })
    }

    /// Size and content type, defaulting to `application/octet-stream`
    pub async fn get_file_metadata(&self, storage_key: &str) -> Result<FileMetadata, UploadError> {
        let info = self.storage.head_object(storage_key).await.map_err(|e| {
            tracing::error!(error = %e, key = %storage_key, "Failed to read file metadata");
            UploadError::storage("head", e.to_string())
        })?;
        Ok(FileMetadata::new(info.size, info.content_type))
    }

    pub async fn get_file(&self, storage_key: &str) -> Result<ByteStream, UploadError> {
        self.storage.get_object(storage_key).await.map_err(|e| {
            tracing::error!(error = %e, key = %storage_key, "Failed to fetch file");
            UploadError::storage("get", e.to_string())
        })
    }
}
