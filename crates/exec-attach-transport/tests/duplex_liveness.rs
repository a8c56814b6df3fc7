//! Concurrent duplex liveness for both backends.
//!
//! A read loop and a write loop share one transport, the write loop pausing
//! between writes. Both loops must finish within a bound of roughly twice the
//! total configured pause; a naive single-lock transport starves the reader
//! and hangs here instead.

use std::{path::PathBuf, sync::Arc, time::Duration};

use exec_attach_transport::{
    NamedPipeTransport, StreamSocketTransport, Transport, TransportConfig, TransportError,
    connect_addr,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
    time::timeout,
};
#[cfg(unix)]
use tokio::net::UnixListener;

const PAUSE: Duration = Duration::from_millis(400);

/// Serve one connection: echo a reply line for every received line, close
/// the write side after replying to "exit".
async fn serve_lines<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = format!("ack {line}\n");
        if write_half.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
        if line == "exit" {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

/// Run the paused-writer scenario against `transport` and assert both loops
/// complete within twice the total pause.
async fn assert_duplex_liveness(transport: Arc<dyn Transport>) {
    let total_pause = PAUSE * 2;

    let reader = Arc::clone(&transport);
    let read_loop = tokio::spawn(async move {
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(e) => panic!("read loop failed: {e}"),
            }
        }
        received
    });

    let writer = Arc::clone(&transport);
    let write_loop = tokio::spawn(async move {
        writer.write(b"first\n").await?;
        tokio::time::sleep(PAUSE).await;
        writer.write(b"second\n").await?;
        tokio::time::sleep(PAUSE).await;
        writer.write(b"exit\n").await?;
        Ok::<(), TransportError>(())
    });

    let (received, write_result) = timeout(total_pause * 2, async {
        let received = read_loop.await.unwrap();
        let write_result = write_loop.await.unwrap();
        (received, write_result)
    })
    .await
    .expect("duplex loops must complete within twice the total pause");

    write_result.unwrap();
    let text = String::from_utf8(received).unwrap();
    assert_eq!(text, "ack first\nack second\nack exit\n");

    transport.close().await;
}

#[cfg(unix)]
fn unix_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("exec-attach-liveness-{}.sock", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_stream_socket_concurrent_duplex_liveness() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let authority = listener.local_addr().unwrap().to_string();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve_lines(stream).await;
    });

    let transport =
        StreamSocketTransport::connect(&authority, &TransportConfig::default())
            .await
            .unwrap();
    assert_duplex_liveness(Arc::new(transport)).await;

    server.await.unwrap();
}

#[tokio::test]
#[cfg(unix)]
async fn test_named_pipe_concurrent_duplex_liveness() {
    let path = unix_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve_lines(stream).await;
    });

    let transport = NamedPipeTransport::connect(&path, &TransportConfig::default())
        .await
        .unwrap();
    assert_duplex_liveness(Arc::new(transport)).await;

    server.await.unwrap();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
#[cfg(unix)]
async fn test_pipe_write_not_blocked_by_pending_read() {
    let path = unix_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        serve_lines(stream).await;
    });

    let transport = Arc::new(
        NamedPipeTransport::connect(&path, &TransportConfig::default())
            .await
            .unwrap(),
    );

    // Park the read direction first; the server has nothing to send yet.
    let reader = Arc::clone(&transport);
    let read_task = tokio::spawn(async move {
        let mut buf = [0u8; 4096];
        reader.read(&mut buf).await
    });
    tokio::task::yield_now().await;

    // The write direction must stay available.
    timeout(Duration::from_millis(500), transport.write(b"exit\n"))
        .await
        .expect("write must not wait on the pending read")
        .unwrap();

    let n = timeout(Duration::from_secs(2), read_task)
        .await
        .expect("read must observe the reply")
        .unwrap()
        .unwrap();
    assert!(n > 0);

    transport.close().await;
    server.await.unwrap();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_malformed_address_is_an_address_error() {
    let result = connect_addr("not-an-address", &TransportConfig::default()).await;
    assert!(matches!(result, Err(TransportError::Address(_))));
}

#[tokio::test]
async fn test_connect_failure_is_a_connect_error() {
    // Port 1 on localhost is essentially never listening.
    let result =
        StreamSocketTransport::connect("127.0.0.1:1", &TransportConfig::default()).await;
    assert!(matches!(
        result,
        Err(TransportError::Connect { .. })
    ));
}
