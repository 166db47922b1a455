//! Pure, total functions translating ECS concepts into Kubernetes object
//! specs. Nothing in this module touches a cluster: given the same inputs
//! it always returns the same typed `k8s-openapi` struct, which is what
//! lets the Kubernetes Resource Managers (`crate::k8s::managers`) and this
//! module's own unit tests stay decoupled from a live cluster.

pub mod labels;
pub mod pod_spec;
pub mod secret_naming;
pub mod service;

pub use labels::{sanitize_label_value, service_pod_labels, tags_to_annotations, tags_to_labels};
pub use pod_spec::{container_definitions_to_pod_spec, RunTaskOverrides};
pub use secret_naming::{secrets_manager_secret_name, ssm_secret_name};
pub use service::service_to_deployment_and_service;
