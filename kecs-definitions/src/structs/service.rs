use crate::arn::Arn;
use crate::states::ServiceStatus;
use crate::structs::common::{NetworkConfiguration, Tag};
use serde::{Deserialize, Serialize};

/// A running, desired-state-driven group of tasks behind a task
/// definition.
///
/// Maps to a Kubernetes `Deployment` + headless `Service` in the cluster's
/// namespace. Invariants
///:
///   1. `desired_count >= 0` (enforced by the `u32` type itself)
///   2. force-free `DeleteService` requires `desired_count == 0`
///   3. `running_count + pending_count` must not exceed
///      `ceil(desired_count * deployment_configuration.max_percent / 100)`
///
/// ```json
/// {
///   "serviceName": "web-svc",
///   "desiredCount": 2,
///   "launchType": "FARGATE",
///   "deploymentConfiguration": {"maximumPercent": 200, "minimumHealthyPercent": 100}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub arn: Arn,
    pub name: String,
    pub cluster_arn: Arn,
    pub task_definition_arn: Arn,
    #[serde(default)]
    pub desired_count: u32,
    #[serde(default)]
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    pub launch_type: LaunchType,
    #[serde(default)]
    pub platform_version: Option<String>,
    #[serde(default)]
    pub scheduling_strategy: SchedulingStrategy,
    pub status: ServiceStatus,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,
    #[serde(default)]
    pub service_registries: Vec<ServiceRegistry>,
    #[serde(default)]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(default)]
    pub deployment_configuration: DeploymentConfiguration,
    #[serde(default)]
    pub placement_constraints: Vec<crate::structs::task_definition::PlacementConstraint>,
    #[serde(default)]
    pub capacity_provider_strategy: Vec<crate::structs::cluster::CapacityProviderStrategyItem>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub health_check_grace_period_seconds: Option<u32>,
    #[serde(default)]
    pub enable_execute_command: bool,
    #[serde(default)]
    pub propagate_tags: Option<String>,
    /// `<clusterName>-<region>` — the namespace holding this service's
    /// workload objects.
    pub kube_namespace: String,
    /// `ecs-service-<serviceName>`.
    pub kube_deployment_name: String,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchType {
    Fargate,
    Ec2,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingStrategy {
    Replica,
    Daemon,
}

impl Default for SchedulingStrategy {
    fn default() -> Self {
        SchedulingStrategy::Replica
    }
}

/// Deployment rollout tuning. Defaults match AWS: `maxPercent = 200`,
/// `minHealthyPercent = 100`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeploymentConfiguration {
    #[serde(default = "default_max_percent")]
    pub maximum_percent: u32,
    #[serde(default = "default_min_healthy_percent")]
    pub minimum_healthy_percent: u32,
}

fn default_max_percent() -> u32 {
    200
}
fn default_min_healthy_percent() -> u32 {
    100
}

impl Default for DeploymentConfiguration {
    fn default() -> Self {
        DeploymentConfiguration {
            maximum_percent: default_max_percent(),
            minimum_healthy_percent: default_min_healthy_percent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancer {
    #[serde(default)]
    pub target_group_arn: Option<String>,
    pub container_name: String,
    pub container_port: u16,
}

/// Service Discovery registration: each entry maintains a
/// headless Service + Endpoints keyed by SD namespace/service name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRegistry {
    pub registry_arn: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub container_port: Option<u16>,
}

impl Service {
    pub fn derive_kube_names(cluster_name: &str, region: &str, service_name: &str) -> (String, String) {
        (
            format!("{cluster_name}-{region}"),
            format!("ecs-service-{service_name}"),
        )
    }

    /// Whether running+pending stays within the rolling-update ceiling.
    pub fn within_capacity(&self) -> bool {
        let cap = crate::math::max_allowed_tasks(
            self.desired_count,
            self.deployment_configuration.maximum_percent,
        );
        self.running_count + self.pending_count <= cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kube_name_derivation() {
        let (ns, dep) = Service::derive_kube_names("prod", "us-east-1", "web-svc");
        assert_eq!(ns, "prod-us-east-1");
        assert_eq!(dep, "ecs-service-web-svc");
    }

    #[test]
    fn default_deployment_configuration_matches_aws() {
        let dc = DeploymentConfiguration::default();
        assert_eq!(dc.maximum_percent, 200);
        assert_eq!(dc.minimum_healthy_percent, 100);
    }
}
