//! ProcessLauncher port
//! Interface for spawning one OS process and owning its lifetime

use crate::domain::{DomainError, ServiceSpec};
use async_trait::async_trait;
use std::fmt;

/// Live/exited status of a launched process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    /// Exit code; `-1` when the process was terminated by a signal.
    Exited(i32),
}

impl ProcessStatus {
    pub fn is_running(self) -> bool {
        self == ProcessStatus::Running
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "running"),
            ProcessStatus::Exited(code) => write!(f, "exited({code})"),
        }
    }
}

/// Owns exactly one OS process.
///
/// The exit status transitions at most once, from `Running` to `Exited`.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    fn pid(&self) -> u32;

    fn name(&self) -> &str;

    fn status(&self) -> ProcessStatus;

    /// Send a forceful termination and resolve once the OS reports the exit.
    ///
    /// Implementations must start observing the exit before the signal is
    /// sent. Killing an already-exited process resolves with its exit code.
    async fn kill(&self) -> Result<i32, DomainError>;

    /// Resolve once the process exits on its own.
    async fn wait(&self) -> Result<i32, DomainError>;
}

impl fmt::Debug for dyn ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("name", &self.name())
            .field("pid", &self.pid())
            .field("status", &self.status())
            .finish()
    }
}

/// Port for starting system processes
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the process described by `spec`.
    ///
    /// Spawn failures (missing executable, permission denied) are terminal and
    /// surface as [`DomainError::Spawn`].
    async fn launch(&self, spec: &ServiceSpec) -> Result<Box<dyn ProcessHandle>, DomainError>;
}
