//! The duplex transport contract and its generic implementation.
//!
//! Both backends are the same [`DuplexChannel`] over a split read/write half
//! pair. Each half sits behind its own `tokio::sync::Mutex`, so one in-flight
//! read and one in-flight write never serialize on a shared handle. A write
//! loop sleeping between writes can therefore never starve the read loop -
//! the failure mode naive single-handle pipe clients exhibit.
//!
//! Callers never issue two concurrent reads or two concurrent writes against
//! the same transport; one read plus one write concurrently is always
//! permitted, and every operation is bounded by the configured liveness
//! timeout.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
    time::timeout,
};

use crate::address::AddrError;

/// Transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid address: {0}")]
    Address(#[from] AddrError),
    #[error("Connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Operation exceeded liveness timeout of {0:?}")]
    LivenessTimeout(Duration),
    #[error("Transport is closed")]
    Closed,
}

/// Transport timing configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Bound on connection establishment.
    pub connect_timeout: Duration,
    /// Bound on each read and each write. A stalled operation fails with
    /// [`TransportError::LivenessTimeout`] instead of waiting indefinitely.
    pub io_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
        }
    }
}

/// A bidirectional byte channel to the remote daemon.
///
/// Read and write are independent directions: issuing one read concurrently
/// with one write is always safe and neither blocks the other.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Read into `buf`, returning the byte count. `Ok(0)` means clean EOF.
    ///
    /// # Errors
    /// Returns error on I/O failure, liveness timeout, or a closed transport.
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `bytes`, retrying partial writes until flushed.
    ///
    /// # Errors
    /// Returns error on I/O failure, liveness timeout, or a closed transport.
    async fn write(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Close the transport. Idempotent; secondary shutdown errors are logged,
    /// never surfaced.
    async fn close(&self);

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;
}

/// Generic duplex channel over an async read half and write half.
///
/// The two backends are instantiations of this type; it is also usable over
/// `tokio::io::duplex` halves for in-memory testing.
pub struct DuplexChannel<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
    closed: AtomicBool,
    io_timeout: Duration,
}

impl<R, W> DuplexChannel<R, W> {
    /// Assemble a channel from split halves.
    pub fn new(reader: R, writer: W, config: &TransportConfig) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
            io_timeout: config.io_timeout,
        }
    }
}

#[async_trait]
impl<R, W> Transport for DuplexChannel<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut reader = self.reader.lock().await;
        match timeout(self.io_timeout, reader.read(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(TransportError::LivenessTimeout(self.io_timeout)),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut writer = self.writer.lock().await;
        let flushed = async {
            writer.write_all(bytes).await?;
            writer.flush().await
        };
        match timeout(self.io_timeout, flushed).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(TransportError::LivenessTimeout(self.io_timeout)),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!("Secondary error during transport shutdown: {e}");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
