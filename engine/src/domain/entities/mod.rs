pub mod cluster_handle;
pub mod service_handle;

pub use cluster_handle::ClusterHandle;
pub use service_handle::ServiceHandle;
