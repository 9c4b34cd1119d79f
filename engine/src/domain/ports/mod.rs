pub mod cluster_resources;
pub mod coordination_client;
pub mod process_launcher;
pub mod readiness_probe;

pub use cluster_resources::{
    ConfigMaterializer, PortAllocator, ScratchDir, ServiceLayout, TempDirProvider,
};
pub use coordination_client::{CoordinationClient, CoordinationConnector};
pub use process_launcher::{ProcessHandle, ProcessLauncher, ProcessStatus};
#[cfg(test)]
pub use readiness_probe::MockReadinessProbe;
pub use readiness_probe::{ProbeFactory, ReadinessProbe};
