//! Duplex byte transports and the stream-multiplexing frame codec.
//!
//! Provides:
//! - `TransportAddr` - scheme-based transport selection
//! - `Transport` - the {read, write, close} contract both backends satisfy
//! - `StreamSocketTransport` / `NamedPipeTransport` - the two backends
//! - `FrameDecoder` - the stdout/stderr demultiplexing codec

pub mod address;
pub mod channel;
pub mod pipe;
pub mod protocol;
pub mod socket;

use std::sync::Arc;

pub use address::{AddrError, TransportAddr};
pub use channel::{DuplexChannel, Transport, TransportConfig, TransportError};
pub use pipe::NamedPipeTransport;
pub use protocol::{Frame, FrameDecoder, ProtocolError, StreamKind, encode_frame};
pub use socket::StreamSocketTransport;

/// Connect the backend selected by `addr`.
///
/// The returned transport is the only place backend selection happens;
/// everything downstream works against the `Transport` contract.
///
/// # Errors
/// Returns error if the connection cannot be established.
pub async fn connect(
    addr: &TransportAddr,
    config: &TransportConfig,
) -> Result<Arc<dyn Transport>, TransportError> {
    match addr {
        TransportAddr::Tcp(authority) => {
            let transport = StreamSocketTransport::connect(authority, config).await?;
            Ok(Arc::new(transport))
        }
        TransportAddr::Pipe(path) => {
            let transport = NamedPipeTransport::connect(path, config).await?;
            Ok(Arc::new(transport))
        }
    }
}

/// Parse `addr` and connect the selected backend.
///
/// # Errors
/// Returns error if the address is malformed or the connection fails.
pub async fn connect_addr(
    addr: &str,
    config: &TransportConfig,
) -> Result<Arc<dyn Transport>, TransportError> {
    let parsed = TransportAddr::parse(addr)?;
    connect(&parsed, config).await
}
