//! Thin end-to-end scenario harness.
//!
//! Wires the collaborators together for one run: container create/start,
//! exec create, transport connect, attach, coordinated streaming, teardown.
//! Out of core scope; the streaming components carry the design weight.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use exec_attach_core::{ApiError, ContainerApi, ExecConfig, standard_scenario};
use exec_attach_transport::{
    StreamKind, TransportAddr, TransportConfig, TransportError, connect,
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    coordinator::{CoordinatorError, SessionCoordinator},
    session::{ExecSession, OutputChunk, SessionError, SessionState},
};

/// Image used for the demo container.
pub const SCENARIO_IMAGE: &str = "demo/shell:latest";

/// Scenario failure.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Container API error: {0}")]
    Api(#[from] ApiError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

/// Scenario tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioOptions {
    /// Whether to pause between commands.
    pub use_delays: bool,
    /// Length of each pause when enabled.
    pub pause: Duration,
    /// Transport timing configuration.
    pub transport: TransportConfig,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self {
            use_delays: false,
            pause: Duration::from_secs(5),
            transport: TransportConfig::default(),
        }
    }
}

/// What one scenario run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    /// Distinct stream kinds seen in the output.
    pub kinds_seen: BTreeSet<StreamKind>,
    /// Total decoded chunks.
    pub chunks: u64,
    /// Whether the session ended in `Closed`.
    pub reached_closed: bool,
}

/// Run one end-to-end scenario against `addr`.
///
/// Creates and starts a keep-alive container, creates an exec instance with
/// all three streams attached (no TTY), attaches over the selected transport,
/// runs the standard four-command script, and reports what was observed. The
/// container is force-removed and the session closed whether or not the
/// streaming succeeds.
///
/// # Errors
/// Returns error if any collaborator call, the attachment, or the
/// coordinated run fails.
pub async fn run_scenario(
    api: Arc<dyn ContainerApi>,
    addr: &TransportAddr,
    options: &ScenarioOptions,
) -> Result<ScenarioReport, ScenarioError> {
    let container = api
        .create_and_start_container(SCENARIO_IMAGE, &["ping".into(), "localhost".into()])
        .await?;
    tracing::info!(container = %container, "Container started");

    let exec_id = api
        .create_exec_session(&container, &["shell".into()], ExecConfig::default())
        .await?;
    tracing::info!(exec_id = %exec_id, "Exec instance created");

    let transport = connect(addr, &options.transport).await?;
    let session = ExecSession::attach(exec_id, transport)?;

    let script = standard_scenario(options.use_delays.then_some(options.pause));

    let (tx, mut rx) = mpsc::channel::<OutputChunk>(64);
    let collector = tokio::spawn(async move {
        let mut kinds_seen = BTreeSet::new();
        let mut chunks: u64 = 0;
        while let Some(chunk) = rx.recv().await {
            kinds_seen.insert(chunk.kind);
            chunks += 1;
        }
        (kinds_seen, chunks)
    });

    let coordinator = SessionCoordinator::new(Arc::clone(&session), script, tx)
        .with_teardown(api, container);
    let run_result = coordinator.run().await;

    let (kinds_seen, chunks) = collector
        .await
        .map_err(CoordinatorError::Join)
        .map_err(ScenarioError::Coordinator)?;
    run_result?;

    Ok(ScenarioReport {
        kinds_seen,
        chunks,
        reached_closed: session.state() == SessionState::Closed,
    })
}
