pub mod cluster_settings;
pub mod retry_budget;
pub mod service_kind;
pub mod service_spec;
pub mod service_state;

pub use cluster_settings::ClusterSettings;
pub use retry_budget::RetryBudget;
pub use service_kind::ServiceKind;
pub use service_spec::ServiceSpec;
pub use service_state::ServiceState;
