use crate::arn::Arn;
use crate::states::TaskLifecycle;
use serde::{Deserialize, Serialize};

/// One execution of a task definition — realized as a bare `Pod` for
/// standalone `RunTask`/`StartTask` calls, or as a member pod of a
/// service's `Deployment`-owned `ReplicaSet` (spec GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: uuid::Uuid,
    pub arn: Arn,
    pub cluster_arn: Arn,
    pub task_definition_arn: Arn,
    pub last_status: TaskLifecycle,
    pub desired_status: TaskLifecycle,
    #[serde(default)]
    pub launch_type: Option<String>,
    #[serde(default)]
    pub started_by: Option<String>,
    /// Often `service:<name>` for service-owned tasks.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub stopped_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub stopped_reason: Option<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub network_bindings: Vec<crate::structs::task_definition::PortMapping>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: uuid::Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(default)]
    pub details: Vec<crate::structs::common::KeyValuePair>,
}

impl Task {
    /// Conjunction of container readiness.
    pub fn derive_health_status(&self) -> HealthStatus {
        if self.containers.is_empty() {
            return HealthStatus::Unknown;
        }
        let all_running = self
            .containers
            .iter()
            .all(|c| c.last_status.as_deref() == Some("RUNNING"));
        if all_running {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_is_conjunction_of_containers() {
        let mut t = Task {
            id: uuid::Uuid::new_v4(),
            arn: Arn::task("us-east-1", "1", "prod", "abc"),
            cluster_arn: Arn::cluster("us-east-1", "1", "prod"),
            task_definition_arn: Arn::task_definition("us-east-1", "1", "web", 1),
            last_status: TaskLifecycle::Running,
            desired_status: TaskLifecycle::Running,
            launch_type: None,
            started_by: None,
            group: None,
            cpu: None,
            memory: None,
            containers: vec![Container {
                name: "app".into(),
                last_status: Some("RUNNING".into()),
                exit_code: None,
                reason: None,
                network_bindings: vec![],
            }],
            started_at: None,
            stopped_at: None,
            stopped_reason: None,
            health_status: HealthStatus::Unknown,
            attachments: vec![],
        };
        assert_eq!(t.derive_health_status(), HealthStatus::Healthy);

        t.containers.push(Container {
            name: "sidecar".into(),
            last_status: Some("PENDING".into()),
            exit_code: None,
            reason: None,
            network_bindings: vec![],
        });
        assert_eq!(t.derive_health_status(), HealthStatus::Unhealthy);
    }
}
