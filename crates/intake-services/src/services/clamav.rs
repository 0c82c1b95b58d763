//! ClamAV daemon client speaking the raw `INSTREAM` protocol over TCP.

use async_trait::async_trait;
use intake_core::{ScanOutcome, ScannerConfig};
use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

pub const INSTREAM_COMMAND: &[u8] = b"zINSTREAM\0";
pub const PING_COMMAND: &[u8] = b"zPING\0";
/// Zero-length chunk that terminates an `INSTREAM` upload
pub const END_OF_STREAM: [u8; 4] = [0, 0, 0, 0];
pub const DEFAULT_CHUNK_SIZE: usize = 65536;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Replies longer than this are treated as protocol errors
const MAX_REPLY_LENGTH: usize = 4096;

static FOUND_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"stream: (.+) FOUND").expect("valid clamd FOUND regex"));

#[derive(Debug, thiserror::Error)]
pub enum ClamdError {
    #[error("Connection to clamd failed: {0}")]
    ConnectionFailed(std::io::Error),

    #[error("Clamd exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error talking to clamd: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid clamd response: {0}")]
    InvalidResponse(String),
}

/// Anything that can give a verdict on a buffer.
///
/// Implementations never fail: transport problems come back as
/// [`ScanOutcome::ScanError`] so callers must handle them explicitly.
#[async_trait]
pub trait VirusScanClient: Send + Sync {
    async fn scan(&self, data: &[u8], filename: &str) -> ScanOutcome;

    fn name(&self) -> &'static str;
}

/// Client that reports every buffer as clean
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpScanClient;

#[async_trait]
impl VirusScanClient for NoOpScanClient {
    async fn scan(&self, _data: &[u8], filename: &str) -> ScanOutcome {
        tracing::debug!(filename = %filename, "No-op scan client, reporting clean");
        ScanOutcome::Clean
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[derive(Debug, Clone)]
pub struct ClamavClient {
    host: String,
    port: u16,
    /// Bound on the whole exchange, connect included
    timeout: Duration,
    chunk_size: usize,
}

impl ClamavClient {
    /// Create a client for the daemon at `host:port` with the default 30 second timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_timeout(host, port, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// `None` when no daemon host is configured
    pub fn from_config(config: &ScannerConfig) -> Option<Self> {
        config
            .clamav_host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(|host| Self::with_timeout(host, config.clamav_port, config.clamav_timeout()))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<TcpStream, ClamdError> {
        TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(ClamdError::ConnectionFailed)
    }

    /// Stream `data` to the daemon and parse its verdict.
    ///
    /// The connection is dropped as soon as the first reply has been read.
    pub async fn scan_bytes(&self, data: &[u8]) -> Result<ScanOutcome, ClamdError> {
        let exchange = async {
            let mut stream = self.connect().await?;
            send_instream(&mut stream, data, self.chunk_size).await?;
            read_reply(&mut stream).await
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClamdError::Timeout(self.timeout))??;

        tracing::debug!(response = %reply, "ClamAV response");
        Ok(parse_response(&reply))
    }

    /// Check daemon liveness with `PING`.
    pub async fn ping(&self) -> Result<bool, ClamdError> {
        let exchange = async {
            let mut stream = self.connect().await?;
            stream.write_all(PING_COMMAND).await?;
            stream.flush().await?;
            read_reply(&mut stream).await
        };

        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClamdError::Timeout(self.timeout))??;

        Ok(reply == "PONG")
    }
}

#[async_trait]
impl VirusScanClient for ClamavClient {
    async fn scan(&self, data: &[u8], filename: &str) -> ScanOutcome {
        let start = Instant::now();
        tracing::debug!(
            address = %self.address(),
            filename = %filename,
            size_bytes = data.len(),
            "Starting ClamAV scan"
        );

        match self.scan_bytes(data).await {
            Ok(outcome) => {
                tracing::info!(
                    filename = %filename,
                    clean = outcome.is_clean(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "ClamAV scan completed"
                );
                outcome
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    address = %self.address(),
                    filename = %filename,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "ClamAV scan failed"
                );
                ScanOutcome::ScanError {
                    cause: e.to_string(),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "clamav"
    }
}

/// Write `zINSTREAM\0`, each chunk behind its big-endian `u32` length, then the terminator.
pub async fn send_instream<W>(writer: &mut W, data: &[u8], chunk_size: usize) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(INSTREAM_COMMAND).await?;
    for chunk in data.chunks(chunk_size) {
        let len = (chunk.len() as u32).to_be_bytes();
        writer.write_all(&len).await?;
        writer.write_all(chunk).await?;
    }
    writer.write_all(&END_OF_STREAM).await?;
    writer.flush().await
}

/// Read one reply, terminated by NUL, newline or EOF.
async fn read_reply<R>(reader: &mut R) -> Result<String, ClamdError>
where
    R: AsyncRead + Unpin,
{
    let mut reply = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if let Some(end) = buf[..n].iter().position(|&b| b == 0 || b == b'\n') {
            reply.extend_from_slice(&buf[..end]);
            break;
        }
        reply.extend_from_slice(&buf[..n]);
        if reply.len() > MAX_REPLY_LENGTH {
            return Err(ClamdError::InvalidResponse(
                "reply exceeds maximum length".to_string(),
            ));
        }
    }

    if reply.is_empty() {
        return Err(ClamdError::InvalidResponse(
            "connection closed without a reply".to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&reply).trim().to_string())
}

/// Map a daemon reply to a verdict.
///
/// - `stream: OK` is clean
/// - anything containing `FOUND` is infected; the name comes from `stream: <name> FOUND`
/// - everything else (`... ERROR`, garbage) is a scan error
pub fn parse_response(response: &str) -> ScanOutcome {
    let response = response.trim_matches(|c: char| c == '\0' || c.is_whitespace());

    if response == "stream: OK" {
        return ScanOutcome::Clean;
    }

    if response.contains("FOUND") {
        let signature = FOUND_PATTERN
            .captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        return ScanOutcome::Infected { signature };
    }

    ScanOutcome::ScanError {
        cause: format!("Unexpected clamd response: {}", response),
    }
}
