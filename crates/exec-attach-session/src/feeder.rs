//! The write loop: drive a scripted command sequence into stdin.

use std::sync::Arc;

use exec_attach_core::CommandScript;
use tokio_util::sync::CancellationToken;

use crate::session::{ExecSession, SessionError};

/// What the feeder accomplished before stopping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeederStats {
    /// Commands fully written.
    pub commands_sent: usize,
    /// Whether the feeder stopped on cancellation.
    pub cancelled: bool,
}

/// Writes a scripted sequence of commands to a session's stdin, honoring the
/// optional pause after each write.
///
/// Pauses suspend only the feeder's task; the read loop keeps running. A
/// write failure stops the script immediately - the session may already be
/// half-closed, and replaying input has no defined semantics.
pub struct CommandFeeder {
    session: Arc<ExecSession>,
    script: CommandScript,
    cancel: CancellationToken,
}

impl CommandFeeder {
    /// Create a feeder for `script`.
    #[must_use]
    pub fn new(session: Arc<ExecSession>, script: CommandScript, cancel: CancellationToken) -> Self {
        Self {
            session,
            script,
            cancel,
        }
    }

    /// Send the script in order.
    ///
    /// # Errors
    /// Returns the first write error; never retries.
    pub async fn run(self) -> Result<FeederStats, SessionError> {
        let mut stats = FeederStats::default();
        for command in self.script.commands() {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    stats.cancelled = true;
                    break;
                }
                result = self.session.write_input(&command.payload) => result?,
            }
            stats.commands_sent += 1;

            if let Some(pause) = command.pause_after {
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        stats.cancelled = true;
                        break;
                    }
                    () = tokio::time::sleep(pause) => {}
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use exec_attach_core::{ExecId, ScriptedCommand};
    use exec_attach_transport::{DuplexChannel, TransportConfig};
    use tokio::io::AsyncReadExt;

    use super::*;

    fn attached_session() -> (Arc<ExecSession>, tokio::io::DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let (r, w) = tokio::io::split(near);
        let transport = Arc::new(DuplexChannel::new(r, w, &TransportConfig::default()));
        let session = ExecSession::attach(ExecId("exec-feed".into()), transport).unwrap();
        (session, far)
    }

    #[tokio::test]
    async fn test_feeder_sends_script_in_order() {
        let (session, mut far) = attached_session();
        let script = CommandScript::from_lines(&["one", "two"], None);
        let feeder = CommandFeeder::new(session, script, CancellationToken::new());

        let stats = feeder.run().await.unwrap();
        assert_eq!(stats.commands_sent, 2);
        assert!(!stats.cancelled);

        let mut buf = [0u8; 32];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"one\ntwo\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_feeder_pauses_between_commands() {
        let (session, _far) = attached_session();
        let script = CommandScript::new()
            .push(ScriptedCommand::line("first").with_pause(Duration::from_secs(5)))
            .push(ScriptedCommand::line("second"));
        let feeder = CommandFeeder::new(session, script, CancellationToken::new());

        let start = tokio::time::Instant::now();
        let stats = feeder.run().await.unwrap();
        assert_eq!(stats.commands_sent, 2);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feeder_cancellation_interrupts_pause() {
        let (session, _far) = attached_session();
        let script = CommandScript::new()
            .push(ScriptedCommand::line("first").with_pause(Duration::from_secs(3600)))
            .push(ScriptedCommand::line("never"));
        let cancel = CancellationToken::new();
        let feeder = CommandFeeder::new(session, script, cancel.clone());

        let task = tokio::spawn(feeder.run());
        tokio::task::yield_now().await;
        cancel.cancel();

        let stats = task.await.unwrap().unwrap();
        assert!(stats.cancelled);
        assert_eq!(stats.commands_sent, 1);
    }

    #[tokio::test]
    async fn test_feeder_stops_on_write_error() {
        let (session, _far) = attached_session();
        session.close().await;

        let script = CommandScript::from_lines(&["doomed"], None);
        let feeder = CommandFeeder::new(session, script, CancellationToken::new());
        assert!(feeder.run().await.is_err());
    }
}
