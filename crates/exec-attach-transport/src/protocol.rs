//! Stream-multiplexing frame codec.
//!
//! Remote output arrives as length-prefixed frames so stdout and stderr can
//! share one connection:
//!
//! ```text
//! [1-byte stream tag][3 reserved bytes][u32 big-endian payload length][payload]
//! ```
//!
//! Stdin flows the other direction raw and unframed. Only the remote encodes
//! in production; `encode_frame` exists for the remote side of tests.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Bytes in the multiplexing header.
pub const HEADER_LEN: usize = 8;

/// Sanity cap on a single frame's payload (16 MiB). A length above this is a
/// corrupt header, not a large frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Which remote stream a frame's payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    /// The wire tag for this stream.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }

    /// Decode a wire tag. Tag 0 (stdin) never appears in output.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// One decoded unit of multiplexed output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Which stream the payload belongs to.
    pub kind: StreamKind,
    /// The payload bytes.
    pub payload: Bytes,
}

/// Malformed frame stream. Cannot be resynchronized; the session must close.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Unknown stream tag {0:#04x} in frame header")]
    UnknownStreamTag(u8),
    #[error("Frame length {len} exceeds maximum {max}")]
    Oversized { len: usize, max: usize },
    #[error("Stream ended mid-frame with {0} undecoded bytes")]
    Truncated(usize),
}

/// Incremental frame decoder with carry-over across reads.
///
/// Frame boundaries never align with transport read boundaries: a header or
/// payload may arrive split across any number of reads, and one read may
/// carry several complete frames. Feed raw bytes in, pull complete frames
/// out; incomplete tails are retained for the next feed.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw transport bytes to the carry-over buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete frame, if one is buffered.
    ///
    /// `Ok(None)` means more bytes are needed, not end of stream.
    ///
    /// # Errors
    /// Returns error on an unknown stream tag or a corrupt length field.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let tag = self.buf[0];
        let kind = StreamKind::from_tag(tag).ok_or(ProtocolError::UnknownStreamTag(tag))?;

        let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::Oversized {
                len,
                max: MAX_FRAME_LEN,
            });
        }

        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();
        Ok(Some(Frame { kind, payload }))
    }

    /// Number of undecoded carry-over bytes.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Validate that the stream ended on a frame boundary.
    ///
    /// # Errors
    /// Returns error if a partial frame was left undecoded at EOF.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::Truncated(self.buf.len()))
        }
    }
}

/// Encode one frame. Test-side counterpart of [`FrameDecoder`].
#[must_use]
pub fn encode_frame(kind: StreamKind, payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&[kind.tag(), 0, 0, 0]);
    out.extend_from_slice(&u32::try_from(payload.len()).unwrap_or(u32::MAX).to_be_bytes());
    out.extend_from_slice(payload);
    out.freeze()
}
