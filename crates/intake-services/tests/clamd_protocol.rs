//! Drives `ClamavClient` against an in-process fake clamd.

use intake_core::{ErrorKind, ScanOutcome};
use intake_services::{ClamavClient, ClamdError, VirusScanClient, VirusScanner};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// What the fake daemon received during one INSTREAM exchange
#[derive(Debug)]
struct Received {
    command: Vec<u8>,
    chunk_lengths: Vec<u32>,
    payload: Vec<u8>,
}

async fn read_instream(socket: &mut TcpStream) -> Received {
    let mut command = vec![0u8; 10];
    socket.read_exact(&mut command).await.unwrap();

    let mut chunk_lengths = Vec::new();
    let mut payload = Vec::new();
    loop {
        let mut len = [0u8; 4];
        socket.read_exact(&mut len).await.unwrap();
        let len = u32::from_be_bytes(len);
        if len == 0 {
            break;
        }
        chunk_lengths.push(len);
        let mut chunk = vec![0u8; len as usize];
        socket.read_exact(&mut chunk).await.unwrap();
        payload.extend_from_slice(&chunk);
    }

    Received {
        command,
        chunk_lengths,
        payload,
    }
}

/// Accept one connection, record the upload, answer with `reply`.
async fn fake_clamd(reply: &'static [u8]) -> (ClamavClient, oneshot::Receiver<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let received = read_instream(&mut socket).await;
        socket.write_all(reply).await.unwrap();
        let _ = tx.send(received);
    });

    let client = ClamavClient::with_timeout("127.0.0.1", port, Duration::from_secs(5));
    (client, rx)
}

#[tokio::test]
async fn test_clean_reply_and_exact_framing() {
    let (client, rx) = fake_clamd(b"stream: OK\0").await;
    let data: Vec<u8> = (0..150_000u32).map(|i| (i % 251) as u8).collect();

    let outcome = client.scan(&data, "big.pdf").await;
    assert_eq!(outcome, ScanOutcome::Clean);

    let received = rx.await.unwrap();
    assert_eq!(received.command, b"zINSTREAM\0");
    assert_eq!(received.chunk_lengths, vec![65536, 65536, 18928]);
    assert_eq!(received.payload, data);
}

#[tokio::test]
async fn test_custom_chunk_size_framing() {
    let (client, rx) = fake_clamd(b"stream: OK\0").await;
    let client = client.with_chunk_size(1000);
    let data = vec![7u8; 2500];

    assert_eq!(client.scan(&data, "notes.pdf").await, ScanOutcome::Clean);

    let received = rx.await.unwrap();
    assert_eq!(received.chunk_lengths, vec![1000, 1000, 500]);
    assert_eq!(received.payload, data);
}

#[tokio::test]
async fn test_found_reply_extracts_signature() {
    let (client, rx) = fake_clamd(b"stream: Eicar-Test-Signature FOUND\0").await;
    let eicar = b"X5O!P%@AP[4\\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

    let outcome = client.scan(eicar, "eicar.com").await;
    assert_eq!(
        outcome,
        ScanOutcome::Infected {
            signature: "Eicar-Test-Signature".to_string()
        }
    );
    assert_eq!(rx.await.unwrap().chunk_lengths, vec![eicar.len() as u32]);
}

#[tokio::test]
async fn test_error_reply_is_scan_error() {
    let (client, _rx) = fake_clamd(b"INSTREAM size limit exceeded. ERROR\0").await;
    assert!(matches!(
        client.scan(b"payload", "a.bin").await,
        ScanOutcome::ScanError { .. }
    ));
}

#[tokio::test]
async fn test_silent_daemon_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_instream(&mut socket).await;
        // Hold the connection open without replying.
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let client = ClamavClient::with_timeout("127.0.0.1", port, Duration::from_millis(200));
    assert!(matches!(
        client.scan_bytes(b"payload").await,
        Err(ClamdError::Timeout(_))
    ));

    let outcome = client.scan(b"payload", "a.bin").await;
    assert!(!outcome.is_clean());
}

#[tokio::test]
async fn test_timeout_rejects_upload_through_scanner() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = ClamavClient::with_timeout("127.0.0.1", port, Duration::from_millis(200));
    let scanner = VirusScanner::new(true, Some(Arc::new(client)));

    let mut jpeg = vec![0u8; 1024];
    jpeg[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    let err = scanner
        .scan_file(jpeg.into(), "a.jpg", "image/jpeg")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ScanInfrastructureFailure);
}

#[tokio::test]
async fn test_ping_expects_pong() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut command = [0u8; 6];
        socket.read_exact(&mut command).await.unwrap();
        assert_eq!(&command, b"zPING\0");
        socket.write_all(b"PONG\0").await.unwrap();
    });

    let client = ClamavClient::with_timeout("127.0.0.1", port, Duration::from_secs(5));
    assert!(client.ping().await.unwrap());
}

#[tokio::test]
async fn test_refused_connection_is_scan_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = ClamavClient::with_timeout("127.0.0.1", port, Duration::from_secs(5));
    assert!(matches!(
        client.scan_bytes(b"payload").await,
        Err(ClamdError::ConnectionFailed(_))
    ));
}
