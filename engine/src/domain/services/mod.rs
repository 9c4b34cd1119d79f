pub mod cluster_orchestrator;
pub mod port_registry;
pub mod retry_scheduler;
pub mod service_supervisor;

pub use cluster_orchestrator::{
    broker_overrides, coordination_overrides, ClusterDependencies, ClusterOrchestrator,
};
pub use port_registry::PortRegistry;
pub use retry_scheduler::{wait_for_check, RetryScheduler};
pub use service_supervisor::{ServiceSupervisor, SupervisedService};
