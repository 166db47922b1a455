//! Service Discovery → headless Kubernetes Service + Endpoints (spec 4.6).
//!
//! Addresses derive from task pod IPs. Unhealthy tasks are placed in
//! `notReadyAddresses` so DNS resolution naturally excludes them — this is
//! the Testable Property in spec 8 ("for each Task with healthStatus !=
//! HEALTHY, its IP appears in notReadyAddresses, never in addresses").

use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointPort, EndpointSubset, Endpoints, Service as KubeService, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use kecs_definitions::structs::task::{HealthStatus, Task};

pub struct TaskAddress {
    pub ip: String,
    pub health: HealthStatus,
}

pub fn task_addresses(tasks: &[Task]) -> Vec<TaskAddress> {
    tasks
        .iter()
        .filter_map(|t| {
            t.attachments
                .iter()
                .find_map(|a| {
                    a.details
                        .iter()
                        .find(|d| d.name == "privateIPv4Address")
                        .and_then(|d| d.value.clone())
                })
                .map(|ip| TaskAddress {
                    ip,
                    health: t.health_status,
                })
        })
        .collect()
}

/// Applies a headless Service named `service_name` plus its Endpoints in
/// `namespace`, splitting `addresses` from `not_ready_addresses` by health.
pub async fn sync_service_discovery(
    client: &Client,
    namespace: &str,
    service_name: &str,
    port: u16,
    addresses: &[TaskAddress],
) -> anyhow::Result<()> {
    let svc_api: Api<KubeService> = Api::namespaced(client.clone(), namespace);
    let headless = KubeService {
        metadata: ObjectMeta {
            name: Some(service_name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            ports: Some(vec![k8s_openapi::api::core::v1::ServicePort {
                port: port as i32,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    };
    svc_api
        .patch(service_name, &PatchParams::apply("kecs").force(), &Patch::Apply(&headless))
        .await?;

    let ready: Vec<EndpointAddress> = addresses
        .iter()
        .filter(|a| a.health == HealthStatus::Healthy)
        .map(|a| EndpointAddress {
            ip: a.ip.clone(),
            ..Default::default()
        })
        .collect();
    let not_ready: Vec<EndpointAddress> = addresses
        .iter()
        .filter(|a| a.health != HealthStatus::Healthy)
        .map(|a| EndpointAddress {
            ip: a.ip.clone(),
            ..Default::default()
        })
        .collect();

    let endpoints_api: Api<Endpoints> = Api::namespaced(client.clone(), namespace);
    let endpoints = Endpoints {
        metadata: ObjectMeta {
            name: Some(service_name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        subsets: Some(vec![EndpointSubset {
            addresses: if ready.is_empty() { None } else { Some(ready) },
            not_ready_addresses: if not_ready.is_empty() { None } else { Some(not_ready) },
            ports: Some(vec![EndpointPort {
                port: port as i32,
                ..Default::default()
            }]),
        }]),
    };
    endpoints_api
        .patch(service_name, &PatchParams::apply("kecs").force(), &Patch::Apply(&endpoints))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::states::TaskLifecycle;
    use kecs_definitions::structs::common::KeyValuePair;
    use kecs_definitions::structs::task::Attachment;

    fn task_with(ip: &str, health: HealthStatus) -> Task {
        Task {
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
            containers: vec![],
            started_at: None,
            stopped_at: None,
            stopped_reason: None,
            health_status: health,
            attachments: vec![Attachment {
                id: uuid::Uuid::new_v4(),
                kind: "ElasticNetworkInterface".into(),
                status: "ATTACHED".into(),
                details: vec![KeyValuePair {
                    name: "privateIPv4Address".into(),
                    value: Some(ip.to_string()),
                }],
            }],
        }
    }

    #[test]
    fn unhealthy_tasks_extracted_with_their_ip() {
        let tasks = vec![
            task_with("10.0.0.1", HealthStatus::Healthy),
            task_with("10.0.0.2", HealthStatus::Unhealthy),
        ];
        let addrs = task_addresses(&tasks);
        assert_eq!(addrs.len(), 2);
        assert!(addrs.iter().any(|a| a.ip == "10.0.0.2" && a.health == HealthStatus::Unhealthy));
    }
}
