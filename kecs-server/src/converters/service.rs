//! `(Service, TaskDefinition, Cluster, NetworkConfiguration)` →
//! `(Deployment, ClusterIPService)`.

use super::labels::{service_pod_labels, tags_to_annotations};
use super::pod_spec::{container_definitions_to_pod_spec, RunTaskOverrides};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment};
use k8s_openapi::api::core::v1::{PodTemplateSpec, Service as KubeService, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kecs_definitions::structs::{Cluster, Service, TaskDefinition};
use std::collections::BTreeMap;

/// Builds the Deployment + headless-capable ClusterIP Service pair a
/// `CreateService`/`UpdateService` call applies to the cluster's namespace.
pub fn service_to_deployment_and_service(
    service: &Service,
    task_def: &TaskDefinition,
    cluster: &Cluster,
) -> (Deployment, KubeService) {
    let family_revision = task_def.family_revision();
    let labels = service_pod_labels(&cluster.name, &service.name, &family_revision, &service.tags);
    let annotations = tags_to_annotations(&service.tags);

    let service_account_name = task_def
        .task_role_arn
        .as_deref()
        .map(crate::integrations::iam::service_account_name_for_role_arn);

    let pod_spec = container_definitions_to_pod_spec(
        task_def,
        &RunTaskOverrides::default(),
        service_account_name.as_deref(),
    );

    let (max_surge, max_unavailable) = kecs_definitions::math::rolling_update_bounds(
        service.deployment_configuration.maximum_percent,
        service.deployment_configuration.minimum_healthy_percent,
    );

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(service.kube_deployment_name.clone()),
            namespace: Some(service.kube_namespace.clone()),
            labels: Some(labels.clone()),
            annotations: Some(annotations.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(service.desired_count as i32),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&labels)),
                ..Default::default()
            },
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::Int(max_surge as i32)),
                    max_unavailable: Some(IntOrString::Int(max_unavailable as i32)),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    annotations: Some(annotations.clone()),
                    ..Default::default()
                }),
                spec: Some(pod_spec),
            },
            ..Default::default()
        }),
        status: None,
    };

    let ports: Vec<ServicePort> = task_def
        .container_definitions
        .iter()
        .flat_map(|cd| cd.port_mappings.iter())
        .filter_map(|pm| {
            pm.container_port.map(|cp| ServicePort {
                port: cp as i32,
                target_port: Some(IntOrString::Int(cp as i32)),
                name: pm.name.clone(),
                protocol: pm.protocol.clone().map(|p| p.to_uppercase()),
                ..Default::default()
            })
        })
        .collect();

    let kube_service = KubeService {
        metadata: ObjectMeta {
            name: Some(service.kube_deployment_name.clone()),
            namespace: Some(service.kube_namespace.clone()),
            labels: Some(labels.clone()),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&labels)),
            ports: if ports.is_empty() { None } else { Some(ports) },
            cluster_ip: None,
            ..Default::default()
        }),
        status: None,
    };

    (deployment, kube_service)
}

fn selector_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter(|(k, _)| k.as_str() == "kecs.io/service" || k.as_str() == "kecs.io/cluster")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::states::{ClusterStatus, ServiceStatus};
    use kecs_definitions::structs::service::{LaunchType, SchedulingStrategy};
    use kecs_definitions::structs::task_definition::TaskDefinitionStatus;

    fn sample_cluster() -> Cluster {
        Cluster::new("prod", "us-east-1", "000000000000")
    }

    fn sample_task_def() -> TaskDefinition {
        TaskDefinition {
            arn: Arn::task_definition("us-east-1", "1", "web", 1),
            family: "web".into(),
            revision: 1,
            status: TaskDefinitionStatus::Active,
            network_mode: None,
            requires_compatibilities: vec![],
            cpu: None,
            memory: None,
            container_definitions: vec![],
            volumes: vec![],
            task_role_arn: None,
            execution_role_arn: None,
            placement_constraints: vec![],
            proxy_configuration: None,
            tags: vec![],
        }
    }

    fn sample_service() -> Service {
        Service {
            arn: Arn::service("us-east-1", "1", "prod", "web-svc"),
            name: "web-svc".into(),
            cluster_arn: Arn::cluster("us-east-1", "1", "prod"),
            task_definition_arn: Arn::task_definition("us-east-1", "1", "web", 1),
            desired_count: 2,
            running_count: 0,
            pending_count: 0,
            launch_type: LaunchType::Fargate,
            platform_version: None,
            scheduling_strategy: SchedulingStrategy::Replica,
            status: ServiceStatus::Provisioning,
            load_balancers: vec![],
            service_registries: vec![],
            network_configuration: None,
            deployment_configuration: Default::default(),
            placement_constraints: vec![],
            capacity_provider_strategy: vec![],
            tags: vec![],
            health_check_grace_period_seconds: None,
            enable_execute_command: false,
            propagate_tags: None,
            kube_namespace: "prod-us-east-1".into(),
            kube_deployment_name: "ecs-service-web-svc".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn replicas_match_desired_count() {
        let (deployment, _) = service_to_deployment_and_service(&sample_service(), &sample_task_def(), &sample_cluster());
        assert_eq!(deployment.spec.unwrap().replicas, Some(2));
    }

    #[test]
    fn rolling_update_bounds_from_defaults() {
        let (deployment, _) = service_to_deployment_and_service(&sample_service(), &sample_task_def(), &sample_cluster());
        let ru = deployment.spec.unwrap().strategy.unwrap().rolling_update.unwrap();
        assert_eq!(ru.max_surge, Some(IntOrString::Int(100)));
        assert_eq!(ru.max_unavailable, Some(IntOrString::Int(0)));
    }

    #[test]
    fn names_derive_from_service() {
        let (deployment, svc) = service_to_deployment_and_service(&sample_service(), &sample_task_def(), &sample_cluster());
        assert_eq!(deployment.metadata.name.as_deref(), Some("ecs-service-web-svc"));
        assert_eq!(svc.metadata.namespace.as_deref(), Some("prod-us-east-1"));
    }
}
