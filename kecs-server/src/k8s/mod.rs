//! L1/L2 Kubernetes integration: the cluster driver that owns the local
//! cluster's lifecycle, and the resource managers that apply/update/delete
//! the objects the converters produce.

pub mod cluster_driver;
pub mod managers;

pub use cluster_driver::{ClusterDriver, KindClusterDriver, PortMapping};
