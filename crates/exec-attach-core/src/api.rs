//! Container-lifecycle collaborator interface.
//!
//! Creating, starting, and removing containers and exec instances are
//! ordinary remote CRUD calls. The streaming core only needs the identifiers
//! they return, so the whole surface lives behind one trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque container identifier issued by the remote daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque exec-instance identifier issued by the remote daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecId(pub String);

impl ExecId {
    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stream-attachment options for a new exec instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Attach the client to the process's stdin.
    pub attach_stdin: bool,
    /// Attach the client to the process's stdout.
    pub attach_stdout: bool,
    /// Attach the client to the process's stderr.
    pub attach_stderr: bool,
    /// Allocate a TTY. Multiplexed framing only applies when this is false.
    #[serde(default)]
    pub tty: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            attach_stdin: true,
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
        }
    }
}

/// Remote API call failure.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Container not found: {0}")]
    ContainerNotFound(ContainerId),
    #[error("Exec instance not found: {0}")]
    ExecNotFound(ExecId),
    #[error("Remote API call failed: {0}")]
    Remote(String),
}

/// Remote container-lifecycle operations consumed by the streaming core.
#[async_trait]
pub trait ContainerApi: Send + Sync {
    /// Create a container from `image` running `command`, and start it.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    async fn create_and_start_container(
        &self,
        image: &str,
        command: &[String],
    ) -> Result<ContainerId, ApiError>;

    /// Create an exec instance inside a running container.
    ///
    /// # Errors
    /// Returns error if the container is unknown or the remote call fails.
    async fn create_exec_session(
        &self,
        container: &ContainerId,
        command: &[String],
        config: ExecConfig,
    ) -> Result<ExecId, ApiError>;

    /// Remove a container, forcibly if requested.
    ///
    /// # Errors
    /// Returns error if the remote call fails.
    async fn remove_container(&self, container: &ContainerId, force: bool) -> Result<(), ApiError>;
}
