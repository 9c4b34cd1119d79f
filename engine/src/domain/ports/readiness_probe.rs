//! ReadinessProbe port
//! A single proof-of-liveness check against a running service

use crate::domain::{ProbeError, ServiceKind};
use async_trait::async_trait;
use std::time::Duration;

/// One stateless readiness check.
///
/// Every call opens its own connection and reaches exactly one terminal
/// outcome. `elapsed` is the retry budget consumed so far and is only used
/// for diagnostics.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Service this probe answers for.
    fn service(&self) -> ServiceKind;

    async fn check(&self, elapsed: Duration) -> Result<(), ProbeError>;
}

/// Builds the probes the orchestrator needs once ports are known.
pub trait ProbeFactory: Send + Sync {
    fn coordination_probe(&self, port: u16) -> Box<dyn ReadinessProbe>;

    /// The broker is checked through the coordination service it registers with.
    fn broker_probe(&self, coordination_port: u16) -> Box<dyn ReadinessProbe>;
}
