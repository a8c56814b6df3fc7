//! Stream-socket transport backend.

use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time::timeout,
};

use crate::channel::{DuplexChannel, TransportConfig, TransportError};

/// A connected TCP stream socket.
///
/// Strictly byte-stream: reads carry no message boundary and frames never
/// align with read boundaries. The socket is split into owned halves, so the
/// read and write directions are fully independent.
pub type StreamSocketTransport = DuplexChannel<OwnedReadHalf, OwnedWriteHalf>;

impl StreamSocketTransport {
    /// Connect to a `host:port` authority.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established within the
    /// configured connect timeout.
    pub async fn connect(
        authority: &str,
        config: &TransportConfig,
    ) -> Result<Self, TransportError> {
        let connect = TcpStream::connect(authority);
        let stream = timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::Connect {
                addr: authority.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                ),
            })?
            .map_err(|source| TransportError::Connect {
                addr: authority.to_string(),
                source,
            })?;

        // Command bytes are tiny and latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {e}");
        }

        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, config))
    }
}
