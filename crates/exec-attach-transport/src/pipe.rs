//! Named-pipe transport backend.
//!
//! A single duplex pipe handle is the hazardous case for concurrent
//! read-plus-write use: implementations that serialize the two directions on
//! the handle can deadlock a read loop against a sleeping write loop. This
//! backend splits the connection into independent halves up front, so the
//! generic channel's per-direction locking applies identically to pipes and
//! sockets.
//!
//! On Unix the pipe address is a Unix-domain socket path; on Windows it is a
//! `\\.\pipe\name` endpoint.

use std::path::Path;

#[cfg(unix)]
use tokio::net::{
    UnixStream,
    unix::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio::time::timeout;

use crate::channel::{DuplexChannel, TransportConfig, TransportError};

/// A local duplex named-pipe connection.
#[cfg(unix)]
pub type NamedPipeTransport = DuplexChannel<OwnedReadHalf, OwnedWriteHalf>;

/// A local duplex named-pipe connection.
#[cfg(windows)]
pub type NamedPipeTransport = DuplexChannel<
    tokio::io::ReadHalf<tokio::net::windows::named_pipe::NamedPipeClient>,
    tokio::io::WriteHalf<tokio::net::windows::named_pipe::NamedPipeClient>,
>;

#[cfg(unix)]
impl NamedPipeTransport {
    /// Connect to the pipe at `path`.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established within the
    /// configured connect timeout.
    pub async fn connect(path: &Path, config: &TransportConfig) -> Result<Self, TransportError> {
        let stream = timeout(config.connect_timeout, UnixStream::connect(path))
            .await
            .map_err(|_| connect_timeout(path))?
            .map_err(|source| TransportError::Connect {
                addr: path.display().to_string(),
                source,
            })?;

        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, config))
    }
}

#[cfg(windows)]
impl NamedPipeTransport {
    /// Connect to the pipe at `path`.
    ///
    /// A busy pipe server is polled until the connect timeout expires.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established within the
    /// configured connect timeout.
    pub async fn connect(path: &Path, config: &TransportConfig) -> Result<Self, TransportError> {
        use tokio::net::windows::named_pipe::ClientOptions;

        // ERROR_PIPE_BUSY: all server instances are in use.
        const PIPE_BUSY: i32 = 231;

        let open = async {
            loop {
                match ClientOptions::new().open(path) {
                    Ok(client) => break Ok(client),
                    Err(e) if e.raw_os_error() == Some(PIPE_BUSY) => {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    }
                    Err(e) => break Err(e),
                }
            }
        };

        let client = timeout(config.connect_timeout, open)
            .await
            .map_err(|_| connect_timeout(path))?
            .map_err(|source| TransportError::Connect {
                addr: path.display().to_string(),
                source,
            })?;

        let (reader, writer) = tokio::io::split(client);
        Ok(Self::new(reader, writer, config))
    }
}

fn connect_timeout(path: &Path) -> TransportError {
    TransportError::Connect {
        addr: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
    }
}
