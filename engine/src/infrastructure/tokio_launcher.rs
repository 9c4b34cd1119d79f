//! Tokio Process Launcher
//! Real implementation of the ProcessLauncher port using tokio::process
//!
//! Each launched child is owned by a watcher task. The task waits for either
//! the natural exit or a kill request and publishes the exit code exactly
//! once on a watch channel; handles observe that channel.

use crate::domain::ports::{ProcessHandle, ProcessLauncher, ProcessStatus};
use crate::domain::{DomainError, ServiceSpec};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Spawns services as child processes of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessLauncher;

impl TokioProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn launch(&self, spec: &ServiceSpec) -> Result<Box<dyn ProcessHandle>, DomainError> {
        let mut command = Command::new(spec.command());
        command
            .args(spec.args())
            .envs(spec.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.working_dir() {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| DomainError::Spawn {
            command: spec.command().to_string(),
            reason: e.to_string(),
        })?;

        let pid = child.id().ok_or_else(|| DomainError::Spawn {
            command: spec.command().to_string(),
            reason: "process exited before its pid could be read".to_string(),
        })?;

        let name = spec.name().to_string();
        info!(process = %name, pid = pid, command = %spec.command(), "Spawned process");

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(name.clone(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(name.clone(), "stderr", stderr));
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(watch_child(name.clone(), child, kill_rx, exit_tx));

        Ok(Box::new(TokioProcessHandle {
            name,
            pid,
            exit: exit_rx,
            kill: Mutex::new(Some(kill_tx)),
        }))
    }
}

/// Handle to a child owned by a watcher task
pub struct TokioProcessHandle {
    name: String,
    pid: u32,
    exit: watch::Receiver<Option<i32>>,
    /// Taken by the first kill request. Dropping it also kills the child.
    kill: Mutex<Option<oneshot::Sender<()>>>,
}

impl TokioProcessHandle {
    async fn wait_for_exit(&self, mut exit: watch::Receiver<Option<i32>>) -> Result<i32, DomainError> {
        let code = *exit
            .wait_for(Option::is_some)
            .await
            .map_err(|_| DomainError::Shutdown {
                service: self.name.clone(),
                reason: "process watcher ended without reporting an exit".to_string(),
            })?;
        Ok(code.unwrap_or(-1))
    }
}

#[async_trait]
impl ProcessHandle for TokioProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ProcessStatus {
        match *self.exit.borrow() {
            Some(code) => ProcessStatus::Exited(code),
            None => ProcessStatus::Running,
        }
    }

    async fn kill(&self) -> Result<i32, DomainError> {
        // Attach the exit observer before the signal goes out.
        let exit = self.exit.clone();

        let sender = self
            .kill
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            debug!(process = %self.name, pid = self.pid, "Sending kill");
            // The watcher is gone only if the child already exited.
            let _ = sender.send(());
        }

        self.wait_for_exit(exit).await
    }

    async fn wait(&self) -> Result<i32, DomainError> {
        self.wait_for_exit(self.exit.clone()).await
    }
}

async fn watch_child(
    name: String,
    mut child: Child,
    kill: oneshot::Receiver<()>,
    exit: watch::Sender<Option<i32>>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = kill => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            if let Err(e) = child.start_kill() {
                warn!(process = %name, error = %e, "Failed to signal process");
            }
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            warn!(process = %name, error = %e, "Failed to reap process");
            -1
        }
    };
    debug!(process = %name, exit_code = code, "Process exited");
    exit.send_replace(Some(code));
}

/// Exit code, or `-1` when the process was terminated by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

async fn forward_output<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(process = %name, stream = stream, "{}", line),
            Ok(None) => break,
            Err(e) => {
                debug!(process = %name, stream = stream, error = %e, "Stopped reading output");
                break;
            }
        }
    }
}
