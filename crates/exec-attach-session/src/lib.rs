//! Exec session streaming: attach, pump, feed, coordinate.
//!
//! Provides:
//! - `ExecSession` - one attached remote process's stdin/stdout/stderr
//! - `StreamPump` - the read loop draining multiplexed output
//! - `CommandFeeder` - the write loop driving scripted stdin
//! - `SessionCoordinator` - runs both concurrently and governs shutdown
//! - `run_scenario` - the thin end-to-end harness

pub mod coordinator;
pub mod feeder;
pub mod harness;
pub mod pump;
pub mod session;

pub use coordinator::{CoordinatorError, RunReport, SessionCoordinator};
pub use feeder::{CommandFeeder, FeederStats};
pub use harness::{ScenarioError, ScenarioOptions, ScenarioReport, run_scenario};
pub use pump::{PumpStats, StreamPump};
pub use session::{AttachError, ExecSession, OutputChunk, SessionError, SessionState};
