//! Shared fixtures: a fake framed daemon and a recording container API.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use exec_attach_core::{ApiError, ContainerApi, ContainerId, ExecConfig, ExecId};
use exec_attach_transport::{StreamKind, TransportAddr, encode_frame};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpListener,
    sync::Mutex,
    task::JoinHandle,
};
#[cfg(unix)]
use tokio::net::UnixListener;

/// How the fake daemon ends the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonMode {
    /// Reply to every line; end the stream after a `terminate-process` line.
    Shell,
    /// Reply to the first line, then end the stream.
    EchoOnce,
}

/// A one-connection fake daemon speaking the multiplexed output framing.
pub struct FakeDaemon {
    pub addr: TransportAddr,
    handle: JoinHandle<()>,
    socket_path: Option<PathBuf>,
}

impl FakeDaemon {
    /// Listen on an ephemeral TCP port.
    pub async fn spawn_tcp(mode: DaemonMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let authority = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream, mode).await;
        });
        Self {
            addr: TransportAddr::Tcp(authority),
            handle,
            socket_path: None,
        }
    }

    /// Listen on a fresh Unix socket in the temp directory.
    #[cfg(unix)]
    pub async fn spawn_pipe(mode: DaemonMode) -> Self {
        let path = std::env::temp_dir().join(format!("exec-attach-e2e-{}.sock", uuid::Uuid::new_v4()));
        let listener = UnixListener::bind(&path).unwrap();
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            serve(stream, mode).await;
        });
        Self {
            addr: TransportAddr::Pipe(path.clone()),
            handle,
            socket_path: Some(path),
        }
    }

    /// Wait for the daemon's connection to finish.
    pub async fn finish(self) {
        self.handle.await.unwrap();
        if let Some(path) = self.socket_path {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Reply to each raw stdin line with one stdout frame. `echo <text>` replies
/// with `<text>\n`; anything else replies `<line>: ok\n`.
async fn serve<S>(stream: S, mode: DaemonMode)
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let reply = line.strip_prefix("echo ").map_or_else(
            || format!("{line}: ok\n"),
            |rest| format!("{rest}\n"),
        );
        let frame = encode_frame(StreamKind::Stdout, reply.as_bytes());
        if write_half.write_all(&frame).await.is_err() {
            break;
        }
        match mode {
            DaemonMode::EchoOnce => break,
            DaemonMode::Shell if line.starts_with("terminate-process") => break,
            DaemonMode::Shell => {}
        }
    }
    let _ = write_half.shutdown().await;
}

/// In-memory container API that hands out ids and records removals.
#[derive(Default)]
pub struct FakeContainerApi {
    counter: AtomicU64,
    pub removed: Mutex<Vec<(ContainerId, bool)>>,
}

#[async_trait]
impl ContainerApi for FakeContainerApi {
    async fn create_and_start_container(
        &self,
        _image: &str,
        _command: &[String],
    ) -> Result<ContainerId, ApiError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ContainerId(format!("container-{n}")))
    }

    async fn create_exec_session(
        &self,
        container: &ContainerId,
        _command: &[String],
        _config: ExecConfig,
    ) -> Result<ExecId, ApiError> {
        Ok(ExecId(format!("exec-{container}")))
    }

    async fn remove_container(
        &self,
        container: &ContainerId,
        force: bool,
    ) -> Result<(), ApiError> {
        self.removed.lock().await.push((container.clone(), force));
        Ok(())
    }
}
