//! ECS entity structs — the wire/storage shape for every resource this
//! control plane manages. Each submodule owns one entity plus its
//! directly-nested sub-structs, one file per concern, with JSON examples
//! since the ECS wire protocol is JSON/1.1.

pub mod account;
pub mod attribute;
pub mod cluster;
pub mod common;
pub mod service;
pub mod task;
pub mod task_definition;
pub mod task_set;

pub use account::Account;
pub use attribute::Attribute;
pub use cluster::{Cluster, ClusterSettings, CapacityProviderStrategyItem};
pub use common::{KeyValuePair, NetworkConfiguration, Tag};
pub use service::{DeploymentConfiguration, LoadBalancer, Service, ServiceRegistry};
pub use task::{Container as RuntimeContainer, Task};
pub use task_definition::{
    ContainerDefinition, HealthCheck, LogConfiguration, MountPoint, PortMapping, Secret,
    TaskDefinition, Volume,
};
pub use task_set::TaskSet;
