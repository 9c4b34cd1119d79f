//! Thin I/O collaborators the orchestrator calls through simple contracts:
//! port allocation, scratch directories, config files and the launch layout.

use crate::domain::{DomainError, ServiceKind, ServiceSpec};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Hands out currently-unused TCP ports.
///
/// An allocator may return a port it returned before; deduplication against
/// ports already claimed by this process is the orchestrator's job.
#[async_trait]
pub trait PortAllocator: Send + Sync {
    async fn find_port(&self) -> Result<u16, DomainError>;
}

/// A scratch directory that exists for as long as this value does.
pub trait ScratchDir: Send + Sync + fmt::Debug {
    /// Absolute path of the directory.
    fn path(&self) -> &Path;
}

/// Creates fresh writable directories.
pub trait TempDirProvider: Send + Sync {
    /// Create a directory whose name starts with `prefix`. Dropping the
    /// returned guard removes it.
    fn create(&self, prefix: &str) -> Result<Box<dyn ScratchDir>, DomainError>;
}

/// Writes a ready-to-use configuration file for one service.
#[async_trait]
pub trait ConfigMaterializer: Send + Sync {
    /// Write the config for `kind` into `dir`, applying `overrides` on top of
    /// the template. Resolves with `dir`.
    async fn materialize(
        &self,
        kind: ServiceKind,
        dir: &Path,
        overrides: &[(String, String)],
    ) -> Result<PathBuf, DomainError>;
}

/// Knows which commands start and stop each service.
pub trait ServiceLayout: Send + Sync {
    /// Launch spec for `kind`, running out of `dir` and listening on `port`.
    fn launch_spec(&self, kind: ServiceKind, dir: &Path, port: u16) -> ServiceSpec;

    /// External stop procedure for `kind`, invoked without arguments.
    fn stop_spec(&self, kind: ServiceKind) -> ServiceSpec;
}
