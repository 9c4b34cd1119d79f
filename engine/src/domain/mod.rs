//! Domain layer: lifecycle rules for managed services, free of OS and network I/O

pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{ClusterHandle, ServiceHandle};
pub use error::{DomainError, ProbeError, Result};
pub use value_objects::{ClusterSettings, RetryBudget, ServiceKind, ServiceSpec, ServiceState};
