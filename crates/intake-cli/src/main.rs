//! Intake CLI: validate, scan and store files from the command line.
//!
//! Configuration comes from the environment (and `.env`); see `intake_core::Config`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use intake_cli::{
    file_name, init_tracing, metadata_map, parse_metadata_pair, read_file, report_upload_error,
    resolve_content_type,
};
use intake_core::{
    CategoryPolicies, Config, ErrorMetadata, FileCategory, ScannerConfig, UploadError,
    UploadOptions, UploadRequest,
};
use intake_processing::FileValidator;
use intake_services::{ClamavClient, StorageOrchestrator, VirusScanner};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "intake", about = "Secure file ingestion CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective policy of every upload category
    Categories,
    /// Validate and scan a file without storing it
    Check {
        /// Path to the file
        file: PathBuf,
        /// Upload category, e.g. speaker-photos
        #[arg(long)]
        category: FileCategory,
        /// Declared content type; inferred from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// Validate, scan and store a file
    Upload {
        /// Path to the file
        file: PathBuf,
        #[arg(long)]
        category: FileCategory,
        #[arg(long)]
        mime: Option<String>,
        /// Extra metadata as key=value, repeatable
        #[arg(long = "meta", value_parser = parse_metadata_pair)]
        metadata: Vec<(String, String)>,
        /// Skip the virus scan for this upload
        #[arg(long)]
        no_scan: bool,
    },
    /// Download a stored file
    Download {
        /// Storage key
        key: String,
        /// Destination path
        output: PathBuf,
    },
    /// Delete a stored file (best effort)
    Delete {
        /// Storage key
        key: String,
    },
    /// Print a temporary download URL
    Sign {
        /// Storage key
        key: String,
        /// Lifetime in seconds; defaults to SIGNED_URL_TTL_SECS
        #[arg(long)]
        expires: Option<u64>,
    },
    /// Show size and content type of a stored file
    Head {
        /// Storage key
        key: String,
    },
}

#[derive(Serialize)]
struct CategoryView<'a> {
    category: FileCategory,
    max_size: String,
    allowed_types: &'a [String],
    verify_magic_bytes: bool,
}

#[derive(Serialize)]
struct CheckReport {
    file: String,
    content_type: String,
    size_bytes: u64,
    scan_engine: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    clamav_available: Option<bool>,
    accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn orchestrator() -> anyhow::Result<StorageOrchestrator> {
    let config = Config::from_env().context("Invalid configuration")?;
    StorageOrchestrator::from_config(&config).await
}

async fn check(path: &Path, category: FileCategory, mime: Option<&str>) -> anyhow::Result<()> {
    let policies = CategoryPolicies::from_env()?;
    let scanner_config = ScannerConfig::from_env()?;
    let content_type = resolve_content_type(path, mime)?;
    let data = read_file(path).await?;

    let clamav_available = match ClamavClient::from_config(&scanner_config) {
        Some(client) if scanner_config.enabled => Some(client.ping().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, address = %client.address(), "ClamAV ping failed");
            false
        })),
        _ => None,
    };

    let scanner = VirusScanner::from_config(&scanner_config);
    let validator = FileValidator::new(policies.get(category).clone());
    let filename = file_name(path);

    let verdict = match validator.validate(&data, &content_type, data.len() as u64) {
        Err(e) => Err(UploadError::from(e)),
        Ok(()) => scanner.scan_file(data.clone(), &filename, &content_type).await,
    };

    let report = CheckReport {
        file: path.display().to_string(),
        content_type,
        size_bytes: data.len() as u64,
        scan_engine: scanner.engine(),
        clamav_available,
        accepted: verdict.is_ok(),
        reason: verdict.as_ref().err().map(|e| e.client_message()),
    };
    print_json(&report)?;

    if let Err(e) = verdict {
        return Err(report_upload_error(e));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Categories => {
            let policies = CategoryPolicies::from_env()?;
            let views: Vec<CategoryView> = policies
                .iter()
                .map(|(category, policy)| CategoryView {
                    category,
                    max_size: policy.max_size_display(),
                    allowed_types: &policy.allowed_mime_types,
                    verify_magic_bytes: policy.verify_magic_bytes,
                })
                .collect();
            print_json(&views)?;
        }
        Commands::Check {
            file,
            category,
            mime,
        } => {
            check(&file, category, mime.as_deref()).await?;
        }
        Commands::Upload {
            file,
            category,
            mime,
            metadata,
            no_scan,
        } => {
            let content_type = resolve_content_type(&file, mime.as_deref())?;
            let data = read_file(&file).await?;
            let request = UploadRequest::new(data, content_type, file_name(&file), category)
                .with_metadata(metadata_map(metadata));
            let options = UploadOptions {
                scan_for_viruses: !no_scan,
                ..Default::default()
            };

            let result = orchestrator()
                .await?
                .upload(request, options)
                .await
                .map_err(report_upload_error)?;
            print_json(&result)?;
        }
        Commands::Download { key, output } => {
            let mut stream = orchestrator()
                .await?
                .get_file(&key)
                .await
                .map_err(report_upload_error)?;
            let mut out = tokio::fs::File::create(&output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("Download interrupted")?;
                out.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            out.flush().await?;
            tracing::info!(key = %key, size_bytes = written, path = %output.display(), "File downloaded");
        }
        Commands::Delete { key } => {
            let outcome = orchestrator().await?.delete(&key).await;
            print_json(&outcome)?;
        }
        Commands::Sign { key, expires } => {
            let url = orchestrator()
                .await?
                .get_signed_url(&key, expires.map(Duration::from_secs))
                .await
                .map_err(report_upload_error)?;
            println!("{}", url);
        }
        Commands::Head { key } => {
            let metadata = orchestrator()
                .await?
                .get_file_metadata(&key)
                .await
                .map_err(report_upload_error)?;
            print_json(&metadata)?;
        }
    }

    Ok(())
}
