use crate::services::clamav::{ClamavClient, VirusScanClient};
use bytes::Bytes;
use intake_core::{ScanOutcome, ScannerConfig, UploadError};
use intake_processing::ContentInspector;
use std::sync::Arc;
use std::time::Instant;

/// Scan orchestration with fail-safe semantics.
///
/// Structural checks always run first. A configured daemon client then has the
/// final word; without one the heuristic inspector decides. The checks run on a
/// separate task so that even a panic inside them becomes a rejection.
#[derive(Clone)]
pub struct VirusScanner {
    enabled: bool,
    client: Option<Arc<dyn VirusScanClient>>,
    inspector: ContentInspector,
}

impl VirusScanner {
    pub fn new(enabled: bool, client: Option<Arc<dyn VirusScanClient>>) -> Self {
        Self {
            enabled,
            client,
            inspector: ContentInspector::new(),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        let client = ClamavClient::from_config(config)
            .map(|client| Arc::new(client) as Arc<dyn VirusScanClient>);
        Self::new(config.enabled, client)
    }

    /// Scanner that admits everything
    pub fn disabled() -> Self {
        Self::new(false, None)
    }

    /// Which engine gives the verdict: a client name, `heuristic` or `disabled`
    pub fn engine(&self) -> &'static str {
        match (&self.client, self.enabled) {
            (_, false) => "disabled",
            (Some(client), true) => client.name(),
            (None, true) => "heuristic",
        }
    }

    /// Reject the file unless every applicable check passes.
    pub async fn scan_file(
        &self,
        data: Bytes,
        filename: &str,
        mime_type: &str,
    ) -> Result<(), UploadError> {
        if !self.enabled {
            tracing::debug!(filename = %filename, "Virus scanning disabled, skipping scan");
            return Ok(());
        }

        let start = Instant::now();
        let scanner = self.clone();
        let task_filename = filename.to_string();
        let task_mime = mime_type.to_string();
        let handle = tokio::spawn(async move {
            scanner
                .run_checks(&data, &task_filename, &task_mime)
                .await
        });

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    filename = %filename,
                    "Scan task aborted, rejecting file"
                );
                Err(UploadError::ScanInfrastructureFailure(format!(
                    "scan task failed: {}",
                    e
                )))
            }
        };

        match &result {
            Ok(()) => tracing::debug!(
                filename = %filename,
                engine = self.engine(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "File passed scan"
            ),
            Err(e) => tracing::warn!(
                filename = %filename,
                engine = self.engine(),
                error_kind = %e.kind(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "File rejected by scan"
            ),
        }

        result
    }

    async fn run_checks(
        &self,
        data: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> Result<(), UploadError> {
        self.inspector.check_structure(data, filename, mime_type)?;

        let Some(client) = &self.client else {
            self.inspector.inspect_heuristics(data, filename, mime_type)?;
            return Ok(());
        };

        match client.scan(data, filename).await {
            ScanOutcome::Clean => Ok(()),
            ScanOutcome::Infected { signature } => {
                tracing::warn!(
                    virus = %signature,
                    filename = %filename,
                    "Rejected infected file upload"
                );
                Err(UploadError::MalwareDetected { signature })
            }
            ScanOutcome::ScanError { cause } => {
                tracing::error!(
                    error = %cause,
                    filename = %filename,
                    engine = client.name(),
                    "Virus scan could not complete"
                );
                Err(UploadError::ScanInfrastructureFailure(cause))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clamav::NoOpScanClient;
    use async_trait::async_trait;
    use intake_core::ErrorKind;

    struct FixedClient(ScanOutcome);

    #[async_trait]
    impl VirusScanClient for FixedClient {
        async fn scan(&self, _data: &[u8], _filename: &str) -> ScanOutcome {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct PanickingClient;

    #[async_trait]
    impl VirusScanClient for PanickingClient {
        async fn scan(&self, _data: &[u8], _filename: &str) -> ScanOutcome {
            panic!("parser crashed");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    fn jpeg(len: usize) -> Bytes {
        let mut data = vec![0u8; len];
        data[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
        Bytes::from(data)
    }

    fn with_client(client: impl VirusScanClient + 'static) -> VirusScanner {
        VirusScanner::new(true, Some(Arc::new(client)))
    }

    #[tokio::test]
    async fn test_disabled_admits_anything() {
        let scanner = VirusScanner::disabled();
        let hostile = Bytes::from_static(b"<script>eval(1)</script>");
        assert!(scanner.scan_file(hostile, "x.jpg", "image/jpeg").await.is_ok());
        assert_eq!(scanner.engine(), "disabled");
    }

    #[tokio::test]
    async fn test_heuristics_without_client() {
        let scanner = VirusScanner::new(true, None);
        assert_eq!(scanner.engine(), "heuristic");
        assert!(scanner.scan_file(jpeg(150), "a.jpg", "image/jpeg").await.is_ok());

        let mut flood = jpeg(150).to_vec();
        flood.extend_from_slice("http://x.test ".repeat(21).as_bytes());
        let err = scanner
            .scan_file(Bytes::from(flood), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SuspiciousContent);
    }

    #[tokio::test]
    async fn test_structural_errors_surface_as_is() {
        let scanner = with_client(NoOpScanClient);
        let err = scanner
            .scan_file(jpeg(50), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StructuralInvalid);
    }

    #[tokio::test]
    async fn test_client_verdict_is_final() {
        let mut flood = jpeg(150).to_vec();
        flood.extend_from_slice("http://x.test ".repeat(21).as_bytes());

        let scanner = with_client(NoOpScanClient);
        assert!(scanner
            .scan_file(Bytes::from(flood), "a.jpg", "image/jpeg")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_infected() {
        let scanner = with_client(FixedClient(ScanOutcome::Infected {
            signature: "Eicar-Test-Signature".to_string(),
        }));
        let err = scanner
            .scan_file(jpeg(150), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            UploadError::MalwareDetected {
                signature: "Eicar-Test-Signature".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_scan_error_never_admits() {
        let scanner = with_client(FixedClient(ScanOutcome::ScanError {
            cause: "connection refused".to_string(),
        }));
        let err = scanner
            .scan_file(jpeg(150), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScanInfrastructureFailure);
    }

    #[tokio::test]
    async fn test_panic_becomes_rejection() {
        let scanner = with_client(PanickingClient);
        let err = scanner
            .scan_file(jpeg(150), "a.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScanInfrastructureFailure);
    }
}
