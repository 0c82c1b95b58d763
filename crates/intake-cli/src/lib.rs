use anyhow::Context;
use bytes::Bytes;
use intake_core::{normalize_mime_type, ErrorMetadata, LogLevel, UploadError};
use intake_processing::content_type_from_extension;
use std::collections::HashMap;
use std::path::Path;

/// Initialize tracing for the CLI.
///
/// `RUST_LOG` overrides the default `intake=info` filter; `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("intake=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Parse a `key=value` metadata argument
pub fn parse_metadata_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

pub fn metadata_map(pairs: Vec<(String, String)>) -> HashMap<String, String> {
    pairs.into_iter().collect()
}

/// Declared type if given, otherwise inferred from the file extension
pub fn resolve_content_type(path: &Path, declared: Option<&str>) -> anyhow::Result<String> {
    if let Some(declared) = declared {
        return Ok(normalize_mime_type(declared));
    }
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    content_type_from_extension(filename)
        .map(str::to_string)
        .with_context(|| {
            format!(
                "Cannot infer content type for {}; pass --mime",
                path.display()
            )
        })
}

pub async fn read_file(path: &Path) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Bytes::from(data))
}

/// Name the upload is recorded under
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}

/// Log an upload error at its own level and turn it into what the user sees.
pub fn report_upload_error(err: UploadError) -> anyhow::Error {
    match err.log_level() {
        LogLevel::Error => tracing::error!(error = %err, code = err.error_code(), "Operation failed"),
        LogLevel::Warn => tracing::warn!(error = %err, code = err.error_code(), "Operation rejected"),
        LogLevel::Debug => tracing::debug!(error = %err, code = err.error_code(), "Operation rejected"),
    }
    anyhow::anyhow!("{} [{}]", err.client_message(), err.error_code())
}
