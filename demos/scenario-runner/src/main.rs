//! Four-scenario demo driver.
//!
//! Runs the standard command script over each transport, with and without
//! inter-command delays. The pipe-with-delays combination is the historically
//! hang-prone one; every combination must finish cleanly.
//!
//! Configure with environment variables:
//! - `EXEC_ATTACH_SOCKET_ADDR` - e.g. `tcp://127.0.0.1:2375`
//! - `EXEC_ATTACH_PIPE_ADDR`   - e.g. `unix:///var/run/daemon.sock`
//! - `EXEC_ATTACH_CONTAINER_ID` / `EXEC_ATTACH_EXEC_ID` - identifiers of a
//!   precreated container and exec instance on that daemon.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use exec_attach_core::{ApiError, ContainerApi, ContainerId, ExecConfig, ExecId};
use exec_attach_session::{ScenarioOptions, run_scenario};
use exec_attach_transport::TransportAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Container API standing in for a full daemon client: hands back the
/// precreated identifiers and treats removal as a no-op (the operator owns
/// the container's lifecycle in this demo).
struct PrecreatedApi {
    container: ContainerId,
    exec: ExecId,
}

#[async_trait]
impl ContainerApi for PrecreatedApi {
    async fn create_and_start_container(
        &self,
        _image: &str,
        _command: &[String],
    ) -> Result<ContainerId, ApiError> {
        Ok(self.container.clone())
    }

    async fn create_exec_session(
        &self,
        _container: &ContainerId,
        _command: &[String],
        _config: ExecConfig,
    ) -> Result<ExecId, ApiError> {
        Ok(self.exec.clone())
    }

    async fn remove_container(
        &self,
        container: &ContainerId,
        _force: bool,
    ) -> Result<(), ApiError> {
        tracing::info!(container = %container, "Skipping removal of precreated container");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let socket_addr = parse_addr("EXEC_ATTACH_SOCKET_ADDR")?;
    let pipe_addr = parse_addr("EXEC_ATTACH_PIPE_ADDR")?;
    let api: Arc<dyn ContainerApi> = Arc::new(PrecreatedApi {
        container: ContainerId(require_env("EXEC_ATTACH_CONTAINER_ID")?),
        exec: ExecId(require_env("EXEC_ATTACH_EXEC_ID")?),
    });

    // Socket first, pipe last; delays toggle within each transport.
    for (label, addr, use_delays) in [
        ("socket, no delays", &socket_addr, false),
        ("socket, delays", &socket_addr, true),
        ("pipe, no delays", &pipe_addr, false),
        ("pipe, delays", &pipe_addr, true),
    ] {
        tracing::info!("Running scenario: {label}");
        let options = ScenarioOptions {
            use_delays,
            ..ScenarioOptions::default()
        };
        match run_scenario(Arc::clone(&api), addr, &options).await {
            Ok(report) => tracing::info!(
                chunks = report.chunks,
                kinds = ?report.kinds_seen,
                closed = report.reached_closed,
                "Scenario finished: {label}"
            ),
            Err(e) => tracing::error!("Scenario failed: {label}: {e}"),
        }
    }

    Ok(())
}

fn require_env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn parse_addr(key: &str) -> anyhow::Result<TransportAddr> {
    let raw = require_env(key)?;
    TransportAddr::parse(&raw).with_context(|| format!("invalid address in {key}: {raw}"))
}
