use crate::arn::Arn;
use crate::structs::common::KeyValuePair;
use serde::{Deserialize, Serialize};

/// Immutable, revisioned definition of how to run one or more containers.
///
/// Registering a new revision never mutates an existing one: `family`
/// groups revisions, `revision` is a dense, monotonically increasing
/// positive integer per family. Deregistering flips
/// `status` to `Inactive` — the row is never deleted.
///
/// ```json
/// {
///   "family": "web",
///   "containerDefinitions": [
///     {"name": "app", "image": "nginx:1.25", "essential": true}
///   ],
///   "cpu": "256",
///   "memory": "512"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub arn: Arn,
    pub family: String,
    pub revision: u32,
    pub status: TaskDefinitionStatus,
    #[serde(default)]
    pub network_mode: Option<String>,
    #[serde(default)]
    pub requires_compatibilities: Vec<String>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub task_role_arn: Option<String>,
    #[serde(default)]
    pub execution_role_arn: Option<String>,
    #[serde(default)]
    pub placement_constraints: Vec<PlacementConstraint>,
    #[serde(default)]
    pub proxy_configuration: Option<ProxyConfiguration>,
    #[serde(default)]
    pub tags: Vec<crate::structs::common::Tag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskDefinitionStatus {
    Active,
    Inactive,
}

impl TaskDefinitionStatus {
    pub fn as_aws_str(&self) -> &'static str {
        match self {
            TaskDefinitionStatus::Active => "ACTIVE",
            TaskDefinitionStatus::Inactive => "INACTIVE",
        }
    }
}

/// One container within a task definition.
///
/// `essential = false` containers are modeled as sidecars: their failure
/// does not propagate to the pod's phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
    #[serde(default)]
    pub memory_reservation: Option<u32>,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
    #[serde(default)]
    pub environment: Vec<KeyValuePair>,
    #[serde(default)]
    pub secrets: Vec<Secret>,
    #[serde(default)]
    pub mount_points: Vec<MountPoint>,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub log_configuration: Option<LogConfiguration>,
    #[serde(default)]
    pub depends_on: Vec<ContainerDependency>,
    #[serde(default = "default_essential")]
    pub essential: bool,
    #[serde(default)]
    pub command: Vec<String>,
}

fn default_essential() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDependency {
    pub container_name: String,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    #[serde(default)]
    pub container_port: Option<u16>,
    #[serde(default)]
    pub host_port: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `secrets[].valueFrom` ARNs route to either the Secrets Manager or SSM
/// integration depending on prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub value_from: String,
}

impl Secret {
    pub fn is_secrets_manager(&self) -> bool {
        self.value_from.starts_with("arn:aws:secretsmanager:")
    }

    pub fn is_ssm(&self) -> bool {
        self.value_from.starts_with("arn:aws:ssm:")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Interval/timeout/retries/startPeriod health check, mapped to a
/// liveness+readiness probe pair by the converters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub command: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub start_period: Option<u32>,
}

fn default_interval() -> u32 {
    30
}
fn default_timeout() -> u32 {
    5
}
fn default_retries() -> u32 {
    3
}

/// `logConfiguration.driver == "awslogs"` triggers the CloudWatch Logs
/// integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfiguration {
    pub log_driver: String,
    #[serde(default)]
    pub options: std::collections::BTreeMap<String, String>,
}

impl LogConfiguration {
    pub fn is_awslogs(&self) -> bool {
        self.log_driver == "awslogs"
    }

    pub fn group(&self) -> Option<&str> {
        self.options.get("awslogs-group").map(String::as_str)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.options
            .get("awslogs-stream-prefix")
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    #[serde(default)]
    pub host_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConstraint {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfiguration {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub container_name: String,
    #[serde(default)]
    pub properties: Vec<KeyValuePair>,
}

impl TaskDefinition {
    /// `family:revision`, the common shorthand used in service/task rows
    /// and the `RegisterTaskDefinition` response.
    pub fn family_revision(&self) -> String {
        format!("{}:{}", self.family, self.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_routing_by_arn_prefix() {
        let s = Secret {
            name: "DB_PW".into(),
            value_from: "arn:aws:secretsmanager:us-east-1:1:secret:db-pw".into(),
        };
        assert!(s.is_secrets_manager());
        assert!(!s.is_ssm());

        let s = Secret {
            name: "DB_PW".into(),
            value_from: "arn:aws:ssm:us-east-1:1:parameter/db-pw".into(),
        };
        assert!(s.is_ssm());
        assert!(!s.is_secrets_manager());
    }

    #[test]
    fn essential_defaults_true() {
        let json = r#"{"name":"app","image":"nginx"}"#;
        let c: ContainerDefinition = serde_json::from_str(json).unwrap();
        assert!(c.essential);
    }
}
