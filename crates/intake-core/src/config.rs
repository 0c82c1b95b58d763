//! Configuration module
//!
//! Configuration is loaded once at startup and passed explicitly to the
//! components that need it. Nothing in the pipeline reads ambient environment
//! state after [`Config::from_env`] returns.

use std::env;
use std::time::Duration;

use crate::policy::CategoryPolicies;
use crate::storage_types::StorageBackend;

// Common constants
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 30;
const SIGNED_URL_TTL_SECS: u64 = 3600;

/// Virus scanning configuration
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Administrative switch; `false` admits every file without inspection.
    pub enabled: bool,
    /// ClamAV daemon host. Heuristic inspection is used when absent.
    pub clamav_host: Option<String>,
    pub clamav_port: u16,
    /// Hard limit on the whole daemon exchange (connect, write, read).
    pub clamav_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clamav_host: None,
            clamav_port: CLAMAV_PORT,
            clamav_timeout_secs: CLAMAV_TIMEOUT_SECS,
        }
    }
}

impl ScannerConfig {
    pub fn clamav_timeout(&self) -> Duration {
        Duration::from_secs(self.clamav_timeout_secs)
    }

    /// Scanner settings alone, for callers that never touch storage.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        Ok(ScannerConfig {
            enabled: match env::var("VIRUS_SCAN_ENABLED") {
                Ok(raw) => parse_flag("VIRUS_SCAN_ENABLED", &raw)?,
                Err(_) => true,
            },
            clamav_host: env::var("CLAMAV_HOST")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            clamav_port: env::var("CLAMAV_PORT")
                .unwrap_or_else(|_| CLAMAV_PORT.to_string())
                .parse()
                .unwrap_or(CLAMAV_PORT),
            clamav_timeout_secs: env::var("CLAMAV_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLAMAV_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CLAMAV_TIMEOUT_SECS must be a valid number"))?,
        })
    }

    /// Scanning disabled entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Parse a boolean switch, accepting the usual spellings and rejecting anything else.
fn parse_flag(name: &str, raw: &str) -> Result<bool, anyhow::Error> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!("{} must be true or false, got {:?}", name, raw)),
    }
}

/// Object store configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub signed_url_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            signed_url_ttl_secs: SIGNED_URL_TTL_SECS,
        }
    }
}

impl StorageConfig {
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.signed_url_ttl_secs)
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub scanner: ScannerConfig,
    pub storage: StorageConfig,
    pub categories: CategoryPolicies,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let scanner = ScannerConfig::from_env()?;

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_TTL_SECS),
        };

        let config = Config {
            environment,
            scanner,
            storage,
            categories: CategoryPolicies::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.scanner.clamav_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "CLAMAV_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.storage.signed_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_TTL_SECS must be greater than zero"
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
            StorageBackend::Memory => {}
        }

        Ok(())
    }
}
