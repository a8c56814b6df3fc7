//! The exec session state machine.

use std::sync::{
    Arc, Mutex as StdMutex,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use exec_attach_core::ExecId;
use exec_attach_transport::{FrameDecoder, ProtocolError, StreamKind, Transport, TransportError};
use thiserror::Error;
use tokio::sync::Mutex;

/// Transport read size per `read_output` iteration.
const READ_BUF_LEN: usize = 8192;

/// Session lifecycle states.
///
/// `Created` and `Attached` are transient inside [`ExecSession::attach`]; a
/// successfully attached session is observable in `Streaming`, then `Closing`
/// while teardown is in flight, then `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Attached,
    Streaming,
    Closing,
    Closed,
}

/// Attachment rejection.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("Exec id is empty")]
    InvalidExecId,
    #[error("Transport is already closed")]
    TransportClosed,
}

/// Session operation failure.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Attach failed: {0}")]
    Attach(#[from] AttachError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Session is not streaming (state: {0:?})")]
    NotStreaming(SessionState),
}

/// One decoded unit of remote output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Which remote stream produced the payload.
    pub kind: StreamKind,
    /// The payload bytes.
    pub payload: Bytes,
}

impl OutputChunk {
    /// The payload as lossy UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Read-direction state: the decoder carry-over and the transport scratch
/// buffer. Owned by whichever task is currently reading; a partially decoded
/// frame survives across `read_output` calls.
struct ReadSide {
    decoder: FrameDecoder,
    scratch: Vec<u8>,
}

/// A client-side handle to one attached remote process execution.
///
/// Owns the transport for the lifetime of the attachment. The read side
/// decodes multiplexed frames; the write side sends raw stdin bytes. One
/// concurrent reader plus one concurrent writer is the supported pattern.
pub struct ExecSession {
    exec_id: ExecId,
    transport: Arc<dyn Transport>,
    read_side: Mutex<ReadSide>,
    state: StdMutex<SessionState>,
    eof: AtomicBool,
}

impl ExecSession {
    /// Attach to the exec instance reachable over `transport`.
    ///
    /// Passes through `Created` and `Attached` and returns the session in
    /// `Streaming`. A remote-side rejection of the exec id surfaces later as
    /// an I/O error or immediate EOF on the stream.
    ///
    /// # Errors
    /// Returns error for a blank exec id or an already-closed transport.
    pub fn attach(
        exec_id: ExecId,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>, SessionError> {
        if exec_id.as_str().trim().is_empty() {
            return Err(AttachError::InvalidExecId.into());
        }
        if transport.is_closed() {
            return Err(AttachError::TransportClosed.into());
        }

        let session = Self {
            exec_id,
            transport,
            read_side: Mutex::new(ReadSide {
                decoder: FrameDecoder::new(),
                scratch: vec![0u8; READ_BUF_LEN],
            }),
            state: StdMutex::new(SessionState::Created),
            eof: AtomicBool::new(false),
        };
        session.set_state(SessionState::Attached);
        session.set_state(SessionState::Streaming);

        tracing::debug!(exec_id = %session.exec_id, "Attached exec session");
        Ok(Arc::new(session))
    }

    /// The exec instance this session is attached to.
    #[must_use]
    pub fn exec_id(&self) -> &ExecId {
        &self.exec_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Whether the remote has signaled end-of-stream.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::SeqCst)
    }

    /// Pull the next decoded output chunk.
    ///
    /// Returns `Ok(None)` once the remote signals completion; every
    /// subsequent call keeps returning `Ok(None)`. Transport reads and frame
    /// decoding happen inside, so frame boundaries never leak to callers.
    ///
    /// # Errors
    /// Returns error if the session is not streaming, the transport fails,
    /// or the frame stream is malformed.
    pub async fn read_output(&self) -> Result<Option<OutputChunk>, SessionError> {
        if self.is_eof() {
            return Ok(None);
        }
        let state = self.state();
        if state != SessionState::Streaming {
            return Err(SessionError::NotStreaming(state));
        }

        let mut read_side = self.read_side.lock().await;
        loop {
            if let Some(frame) = read_side.decoder.next_frame()? {
                return Ok(Some(OutputChunk {
                    kind: frame.kind,
                    payload: frame.payload,
                }));
            }

            let ReadSide { decoder, scratch } = &mut *read_side;
            let n = self.transport.read(scratch).await?;
            if n == 0 {
                decoder.finish()?;
                self.eof.store(true, Ordering::SeqCst);
                tracing::debug!(exec_id = %self.exec_id, "Remote signaled end-of-stream");
                return Ok(None);
            }
            decoder.feed(&scratch[..n]);
        }
    }

    /// Write raw bytes to the remote process's stdin.
    ///
    /// Stdin flows untagged; no framing applies in this direction.
    ///
    /// # Errors
    /// Returns error if the session is not streaming or the write fails.
    pub async fn write_input(&self, bytes: &[u8]) -> Result<(), SessionError> {
        let state = self.state();
        if state != SessionState::Streaming {
            return Err(SessionError::NotStreaming(state));
        }
        self.transport.write(bytes).await?;
        Ok(())
    }

    /// Release the transport and move to `Closed`.
    ///
    /// Idempotent: once a close is underway or done, further calls return
    /// immediately.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, SessionState::Closing | SessionState::Closed) {
                return;
            }
            *state = SessionState::Closing;
        }
        self.transport.close().await;
        self.set_state(SessionState::Closed);
        tracing::debug!(exec_id = %self.exec_id, "Exec session closed");
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }
}
