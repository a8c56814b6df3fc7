//! Scripted stdin command sequences.

use std::time::Duration;

use bytes::Bytes;

/// One stdin write: the bytes to send and an optional pause afterwards.
///
/// The pause is a timing knob for exercising slow writers; no part of the
/// protocol depends on it for correctness.
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    /// Raw bytes written to the remote process's stdin.
    pub payload: Bytes,
    /// Delay to wait after the write completes.
    pub pause_after: Option<Duration>,
}

impl ScriptedCommand {
    /// Create a command with no pause.
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            pause_after: None,
        }
    }

    /// Create a shell line: the text plus a trailing newline.
    #[must_use]
    pub fn line(text: &str) -> Self {
        Self::new(format!("{text}\n").into_bytes())
    }

    /// Attach a pause after the write.
    #[must_use]
    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_after = Some(pause);
        self
    }
}

/// An ordered, immutable sequence of stdin writes, consumed front to back.
#[derive(Debug, Clone, Default)]
pub struct CommandScript {
    commands: Vec<ScriptedCommand>,
}

impl CommandScript {
    /// Create an empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Build a script from shell lines, optionally pausing between them.
    ///
    /// The pause is inserted after every line except the last, matching how
    /// an interactive driver paces its input.
    #[must_use]
    pub fn from_lines(lines: &[&str], pause_between: Option<Duration>) -> Self {
        let last = lines.len().saturating_sub(1);
        let commands = lines
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let cmd = ScriptedCommand::line(text);
                match pause_between {
                    Some(pause) if i < last => cmd.with_pause(pause),
                    _ => cmd,
                }
            })
            .collect();
        Self { commands }
    }

    /// Append a command.
    #[must_use]
    pub fn push(mut self, command: ScriptedCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// The commands in send order.
    #[must_use]
    pub fn commands(&self) -> &[ScriptedCommand] {
        &self.commands
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the script is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sum of all configured pauses.
    #[must_use]
    pub fn total_pause(&self) -> Duration {
        self.commands
            .iter()
            .filter_map(|c| c.pause_after)
            .sum()
    }
}

/// The standard four-command scenario script.
///
/// Lists the working directory, creates `temp`, lists again, then terminates
/// the container's ping process so the remote shell ends the stream.
#[must_use]
pub fn standard_scenario(pause_between: Option<Duration>) -> CommandScript {
    CommandScript::from_lines(
        &[
            "list-directory",
            "make-directory temp",
            "list-directory",
            "terminate-process ping",
        ],
        pause_between,
    )
}
