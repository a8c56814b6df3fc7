//! The read loop: drain decoded output into a consumer.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::{ExecSession, OutputChunk, SessionError};

/// What the pump observed before stopping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Chunks forwarded to the consumer.
    pub chunks: u64,
    /// Payload bytes forwarded.
    pub bytes: u64,
    /// Whether the pump stopped on cancellation rather than EOF.
    pub cancelled: bool,
}

/// Continuously reads decoded output from a session until end-of-stream,
/// a fatal error, or cancellation.
///
/// A broken stream cannot self-heal, so the first error stops the pump; the
/// coordinator decides what to surface.
pub struct StreamPump {
    session: Arc<ExecSession>,
    output: mpsc::Sender<OutputChunk>,
    cancel: CancellationToken,
}

impl StreamPump {
    /// Create a pump forwarding into `output`.
    #[must_use]
    pub fn new(
        session: Arc<ExecSession>,
        output: mpsc::Sender<OutputChunk>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            output,
            cancel,
        }
    }

    /// Run until EOF, error, or cancellation.
    ///
    /// Decoder carry-over lives in the session, so a frame split across
    /// iterations is never dropped.
    ///
    /// # Errors
    /// Returns the first fatal read error; never retries.
    pub async fn run(self) -> Result<PumpStats, SessionError> {
        let mut stats = PumpStats::default();
        loop {
            let chunk = tokio::select! {
                () = self.cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                result = self.session.read_output() => result?,
            };

            let Some(chunk) = chunk else {
                break; // clean EOF
            };

            stats.chunks += 1;
            stats.bytes += chunk.payload.len() as u64;
            if self.output.send(chunk).await.is_err() {
                tracing::debug!("Output consumer dropped; stopping pump");
                break;
            }
        }
        Ok(stats)
    }
}
