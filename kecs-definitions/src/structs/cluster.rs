use crate::arn::Arn;
use crate::states::ClusterStatus;
use crate::structs::common::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A logical grouping of services and tasks.
///
/// In this system a `Cluster` maps to a single namespace within the local
/// Kubernetes cluster (`<clusterName>-<region>`.2). Counts are
/// advisory, reconciled lazily by the background reflector rather than
/// updated transactionally with every service/task change.
///
/// ```json
/// {
///   "clusterName": "prod",
///   "status": "ACTIVE",
///   "runningTasksCount": 4,
///   "pendingTasksCount": 0,
///   "activeServicesCount": 2
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub arn: Arn,
    pub name: String,
    pub status: ClusterStatus,
    #[serde(default)]
    pub running_tasks_count: u32,
    #[serde(default)]
    pub pending_tasks_count: u32,
    #[serde(default)]
    pub active_services_count: u32,
    #[serde(default)]
    pub registered_container_instances_count: u32,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub settings: ClusterSettings,
    #[serde(default)]
    pub capacity_providers: Vec<String>,
    #[serde(default)]
    pub default_capacity_provider_strategy: Vec<CapacityProviderStrategyItem>,
    #[serde(default)]
    pub execute_command_configuration: Option<ExecuteCommandConfiguration>,
    pub region: String,
    pub account_id: String,
    /// Mapped namespace in the local Kubernetes cluster: `<name>-<region>`.
    pub kube_namespace: String,
}

/// Enum-keyed cluster settings (currently just container insights).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSettings {
    #[serde(default)]
    pub container_insights: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityProviderStrategyItem {
    pub capacity_provider: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteCommandConfiguration {
    #[serde(default)]
    pub logging: Option<String>,
}

impl Cluster {
    pub fn new(name: &str, region: &str, account_id: &str) -> Self {
        Cluster {
            arn: Arn::cluster(region, account_id, name),
            name: name.to_string(),
            status: ClusterStatus::Provisioning,
            running_tasks_count: 0,
            pending_tasks_count: 0,
            active_services_count: 0,
            registered_container_instances_count: 0,
            tags: Vec::new(),
            settings: ClusterSettings::default(),
            capacity_providers: Vec::new(),
            default_capacity_provider_strategy: Vec::new(),
            execute_command_configuration: None,
            region: region.to_string(),
            account_id: account_id.to_string(),
            kube_namespace: format!("{name}-{region}"),
        }
    }

    /// Cluster name validation: 1-255 chars, alphanumeric +
    /// hyphen, no leading/trailing/consecutive hyphens.
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.is_empty() || name.len() > 255 {
            return Err(format!(
                "cluster name must be 1-255 characters, got {}",
                name.len()
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err("cluster name must be alphanumeric or hyphen".to_string());
        }
        if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
            return Err(
                "cluster name must not start/end with a hyphen or contain consecutive hyphens"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn tags_map(&self) -> BTreeMap<&str, &str> {
        self.tags
            .iter()
            .map(|t| (t.key.as_str(), t.value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        assert!(Cluster::validate_name("prod").is_ok());
        assert!(Cluster::validate_name("my-cluster-1").is_ok());
    }

    #[test]
    fn rejects_consecutive_or_edge_hyphens() {
        assert!(Cluster::validate_name("-prod").is_err());
        assert!(Cluster::validate_name("prod-").is_err());
        assert!(Cluster::validate_name("pr--od").is_err());
    }

    #[test]
    fn rejects_non_alphanumeric() {
        assert!(Cluster::validate_name("prod_1").is_err());
    }

    #[test]
    fn default_namespace_derivation() {
        let c = Cluster::new("prod", "us-east-1", "000000000000");
        assert_eq!(c.kube_namespace, "prod-us-east-1");
    }
}
