//! Service Supervisor
//!
//! Launch one process, confirm it is actually serving, and hand back a
//! [`ServiceHandle`]. A start attempt that fails never leaves its process
//! running: the supervisor makes a best-effort kill before returning the error.

use crate::constants::retry::SUPERVISED_START_TIMEOUT;
use crate::domain::entities::ServiceHandle;
use crate::domain::ports::{ProcessHandle, ProcessLauncher, ReadinessProbe};
use crate::domain::services::RetryScheduler;
use crate::domain::{DomainError, ServiceKind, ServiceSpec, ServiceState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything needed to start and later stop one service
pub struct SupervisedService {
    pub kind: ServiceKind,
    pub spec: ServiceSpec,
    pub stop: ServiceSpec,
    pub probe: Box<dyn ReadinessProbe>,
    /// Unconditional wait between spawn and the first probe.
    pub grace_delay: Duration,
}

impl SupervisedService {
    pub fn new(
        kind: ServiceKind,
        spec: ServiceSpec,
        stop: ServiceSpec,
        probe: Box<dyn ReadinessProbe>,
    ) -> Self {
        Self {
            kind,
            spec,
            stop,
            probe,
            grace_delay: Duration::ZERO,
        }
    }

    pub fn with_grace_delay(mut self, grace_delay: Duration) -> Self {
        self.grace_delay = grace_delay;
        self
    }
}

pub struct ServiceSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    scheduler: RetryScheduler,
}

impl ServiceSupervisor {
    /// Supervisor with the standard 30s readiness budget.
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            scheduler: RetryScheduler::with_timeout(SUPERVISED_START_TIMEOUT),
        }
    }

    pub fn with_scheduler(mut self, scheduler: RetryScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Spawn the service and retry its probe until it answers.
    ///
    /// `NotStarted -> Launching -> AwaitingReady -> Ready`; any failure ends in
    /// `Failed` and is returned as-is (spawn errors unchanged, exhaustion as
    /// [`DomainError::ReadinessTimeout`]).
    pub async fn start(&self, service: SupervisedService) -> Result<ServiceHandle, DomainError> {
        let SupervisedService {
            kind,
            spec,
            stop,
            probe,
            grace_delay,
        } = service;

        let port = spec.port().ok_or_else(|| {
            DomainError::Config(format!("{kind} launch spec has no listening port"))
        })?;

        let mut state = ServiceState::NotStarted;
        state.advance(ServiceState::Launching)?;
        info!(service = %kind, port = port, command = %spec.command(), "Launching service");

        let process = match self.launcher.launch(&spec).await {
            Ok(process) => process,
            Err(e) => {
                state.advance(ServiceState::Failed)?;
                warn!(service = %kind, error = %e, "Launch failed");
                return Err(e);
            }
        };

        state.advance(ServiceState::AwaitingReady)?;
        debug!(service = %kind, pid = process.pid(), "Waiting for readiness");

        if !grace_delay.is_zero() {
            debug!(
                service = %kind,
                grace_ms = grace_delay.as_millis() as u64,
                "Grace delay before first probe"
            );
            tokio::time::sleep(grace_delay).await;
        }

        if let Err(e) = self.scheduler.wait_until_ready(probe.as_ref()).await {
            state.advance(ServiceState::Failed)?;
            warn!(service = %kind, error = %e, "Service never became ready");
            discard(kind, process.as_ref()).await;
            return Err(e);
        }

        state.advance(ServiceState::Ready)?;
        info!(service = %kind, pid = process.pid(), port = port, "Service ready");

        Ok(ServiceHandle::new(
            kind,
            port,
            process,
            stop,
            self.launcher.clone(),
        ))
    }
}

/// Best-effort kill of a process whose start attempt failed.
async fn discard(kind: ServiceKind, process: &dyn ProcessHandle) {
    match process.kill().await {
        Ok(code) => debug!(service = %kind, exit_code = code, "Discarded unready process"),
        Err(e) => warn!(service = %kind, error = %e, "Failed to kill unready process"),
    }
}
