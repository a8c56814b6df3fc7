//! Runs the pump and feeder concurrently and governs shutdown.

use std::sync::Arc;

use exec_attach_core::{ApiError, CommandScript, ContainerApi, ContainerId};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    feeder::{CommandFeeder, FeederStats},
    pump::{PumpStats, StreamPump},
    session::{ExecSession, OutputChunk, SessionError},
};

/// Coordinated-run failure. Carries which side failed.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Stream pump failed: {0}")]
    Pump(#[source] SessionError),
    #[error("Command feeder failed: {0}")]
    Feeder(#[source] SessionError),
    #[error("Container teardown failed: {0}")]
    Teardown(#[from] ApiError),
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Outcome of a coordinated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// What the read loop observed.
    pub pump: PumpStats,
    /// What the write loop accomplished.
    pub feeder: FeederStats,
}

/// Runs a [`StreamPump`] and a [`CommandFeeder`] concurrently against one
/// session, joins both, then tears down and closes.
///
/// The join is explicit: both outcomes are collected before any teardown
/// starts, the first non-success is surfaced, and the rest are logged. One
/// side failing never crashes the other; nothing is retried.
pub struct SessionCoordinator {
    session: Arc<ExecSession>,
    script: CommandScript,
    output: mpsc::Sender<OutputChunk>,
    cancel: CancellationToken,
    teardown: Option<(Arc<dyn ContainerApi>, ContainerId)>,
}

impl SessionCoordinator {
    /// Create a coordinator for `session`, sending decoded output to
    /// `output` and feeding `script` to stdin.
    #[must_use]
    pub fn new(
        session: Arc<ExecSession>,
        script: CommandScript,
        output: mpsc::Sender<OutputChunk>,
    ) -> Self {
        Self {
            session,
            script,
            output,
            cancel: CancellationToken::new(),
            teardown: None,
        }
    }

    /// Remove `container` (forced) after both loops finish, before the
    /// session closes.
    #[must_use]
    pub fn with_teardown(mut self, api: Arc<dyn ContainerApi>, container: ContainerId) -> Self {
        self.teardown = Some((api, container));
        self
    }

    /// Token that aborts both loops. Cancellation drains the run to a clean
    /// close; it is not reported as an error.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run both loops to completion, tear down, close the session.
    ///
    /// The session is torn down and closed regardless of loop outcomes.
    ///
    /// # Errors
    /// Surfaces the first non-success among pump, feeder, and teardown.
    pub async fn run(self) -> Result<RunReport, CoordinatorError> {
        let Self {
            session,
            script,
            output,
            cancel,
            teardown,
        } = self;

        let pump = StreamPump::new(Arc::clone(&session), output, cancel.clone());
        let feeder = CommandFeeder::new(Arc::clone(&session), script, cancel.clone());

        let pump_task = tokio::spawn(pump.run());
        let feeder_task = tokio::spawn(feeder.run());
        let (pump_join, feeder_join) = tokio::join!(pump_task, feeder_task);

        let pump_result: Result<PumpStats, CoordinatorError> = match pump_join {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(CoordinatorError::Pump(e)),
            Err(e) => Err(CoordinatorError::Join(e)),
        };
        let feeder_result: Result<FeederStats, CoordinatorError> = match feeder_join {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(CoordinatorError::Feeder(e)),
            Err(e) => Err(CoordinatorError::Join(e)),
        };

        let teardown_result = match &teardown {
            Some((api, container)) => api
                .remove_container(container, true)
                .await
                .map_err(CoordinatorError::Teardown),
            None => Ok(()),
        };

        session.close().await;

        // Surface the first non-success; log the rest so nothing is swallowed.
        let mut first_error: Option<CoordinatorError> = None;
        let mut note = |e: CoordinatorError| {
            if first_error.is_none() {
                first_error = Some(e);
            } else {
                tracing::error!("Additional coordinated-run failure: {e}");
            }
        };

        let pump = pump_result.unwrap_or_else(|e| {
            note(e);
            PumpStats::default()
        });
        let feeder = feeder_result.unwrap_or_else(|e| {
            note(e);
            FeederStats::default()
        });
        if let Err(e) = teardown_result {
            note(e);
        }
        drop(note);

        match first_error {
            None => Ok(RunReport { pump, feeder }),
            Some(e) => Err(e),
        }
    }
}
