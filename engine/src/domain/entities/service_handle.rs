//! ServiceHandle entity
//! Caller-facing result of a successfully started and confirmed service

use crate::domain::ports::{ProcessHandle, ProcessLauncher};
use crate::domain::{DomainError, ServiceKind, ServiceSpec, ServiceState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A ready service: its confirmed port and the capability to shut it down.
///
/// `close` consumes the handle, so a handle can only ever be closed once.
pub struct ServiceHandle {
    kind: ServiceKind,
    port: u16,
    state: ServiceState,
    process: Box<dyn ProcessHandle>,
    stop: ServiceSpec,
    launcher: Arc<dyn ProcessLauncher>,
}

impl ServiceHandle {
    pub(crate) fn new(
        kind: ServiceKind,
        port: u16,
        process: Box<dyn ProcessHandle>,
        stop: ServiceSpec,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            kind,
            port,
            state: ServiceState::Ready,
            process,
            stop,
            launcher,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> u32 {
        self.process.pid()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Kill the process, wait for it to exit, then run the external stop
    /// procedure and wait for that too.
    ///
    /// The stop procedure runs even when the kill fails. The first error is
    /// returned.
    pub async fn close(mut self) -> Result<(), DomainError> {
        self.state.advance(ServiceState::Closing)?;
        info!(service = %self.kind, pid = self.pid(), port = self.port, "Stopping service");

        let killed = match self.process.kill().await {
            Ok(code) => {
                debug!(service = %self.kind, exit_code = code, "Process exited");
                Ok(())
            }
            Err(e) => {
                warn!(service = %self.kind, error = %e, "Failed to kill process");
                Err(self.shutdown_error(e))
            }
        };

        let stopped = match run_stop_procedure(self.launcher.as_ref(), &self.stop).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(service = %self.kind, error = %e, "Stop procedure failed");
                Err(self.shutdown_error(e))
            }
        };

        self.state.advance(ServiceState::Closed)?;
        info!(service = %self.kind, "Service closed");
        killed.and(stopped)
    }

    fn shutdown_error(&self, err: DomainError) -> DomainError {
        DomainError::Shutdown {
            service: self.kind.to_string(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("kind", &self.kind)
            .field("port", &self.port)
            .field("state", &self.state)
            .field("process", &self.process)
            .finish()
    }
}

/// Launch the stop script and wait for it. Its exit code is not inspected.
pub(crate) async fn run_stop_procedure(
    launcher: &dyn ProcessLauncher,
    stop: &ServiceSpec,
) -> Result<(), DomainError> {
    debug!(command = %stop.command(), "Running stop procedure");
    let script = launcher.launch(stop).await?;
    let code = script.wait().await?;
    debug!(command = %stop.command(), exit_code = code, "Stop procedure finished");
    Ok(())
}
