use super::clusters;
use super::util::{after_field, bool_field, limit_field, opt_str, str_field, tags_field};
use crate::app_state::AppState;
use crate::converters::service_to_deployment_and_service;
use crate::k8s::managers::service as service_manager;
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::states::ServiceStatus;
use kecs_definitions::structs::common::{AwsVpcConfiguration, NetworkConfiguration};
use kecs_definitions::structs::service::{DeploymentConfiguration, LaunchType, LoadBalancer, SchedulingStrategy, ServiceRegistry};
use kecs_definitions::structs::Service;
use kecs_definitions::Arn;
use serde_json::{json, Value};

fn parse_launch_type(s: Option<&str>) -> LaunchType {
    match s {
        Some("EC2") => LaunchType::Ec2,
        Some("EXTERNAL") => LaunchType::External,
        _ => LaunchType::Fargate,
    }
}

fn parse_load_balancers(body: &Value) -> Vec<LoadBalancer> {
    body.get("loadBalancers")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|lb| {
                    Some(LoadBalancer {
                        target_group_arn: lb.get("targetGroupArn").and_then(Value::as_str).map(str::to_string),
                        container_name: lb.get("containerName")?.as_str()?.to_string(),
                        container_port: lb.get("containerPort")?.as_u64()? as u16,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_service_registries(body: &Value) -> Vec<ServiceRegistry> {
    body.get("serviceRegistries")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|r| {
                    Some(ServiceRegistry {
                        registry_arn: r.get("registryArn")?.as_str()?.to_string(),
                        port: r.get("port").and_then(Value::as_u64).map(|v| v as u16),
                        container_name: r.get("containerName").and_then(Value::as_str).map(str::to_string),
                        container_port: r.get("containerPort").and_then(Value::as_u64).map(|v| v as u16),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_network_configuration(body: &Value) -> Option<NetworkConfiguration> {
    let cfg = body.get("networkConfiguration")?.get("awsvpcConfiguration")?;
    Some(NetworkConfiguration {
        awsvpc_configuration: Some(AwsVpcConfiguration {
            subnets: cfg
                .get("subnets")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            security_groups: cfg
                .get("securityGroups")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            assign_public_ip: cfg.get("assignPublicIp").and_then(Value::as_str).map(str::to_string),
        }),
    })
}

fn to_json(s: &Service) -> Value {
    json!({
        "serviceArn": s.arn.to_string(),
        "serviceName": s.name,
        "clusterArn": s.cluster_arn.to_string(),
        "taskDefinition": s.task_definition_arn.to_string(),
        "desiredCount": s.desired_count,
        "runningCount": s.running_count,
        "pendingCount": s.pending_count,
        "launchType": match s.launch_type { LaunchType::Fargate => "FARGATE", LaunchType::Ec2 => "EC2", LaunchType::External => "EXTERNAL" },
        "status": s.status.as_aws_str(),
        "tags": s.tags,
        "deploymentConfiguration": {
            "maximumPercent": s.deployment_configuration.maximum_percent,
            "minimumHealthyPercent": s.deployment_configuration.minimum_healthy_percent,
        },
    })
}

/// Applies a service's converted Deployment+Service to the cluster and
/// wires up the integrations its task definition's containers trigger
/// (spec 4.2-4.3, 4.6).
async fn apply_and_integrate(state: &AppState, service: &Service) -> anyhow::Result<()> {
    let cluster = state.store.get_cluster_by_arn(&service.cluster_arn.to_string())?;
    let task_def = state.store.resolve_task_definition(&service.task_definition_arn.to_string())?;
    let client = state.kube_client()?;

    if let Some(role_arn) = &task_def.task_role_arn {
        crate::integrations::iam::ensure_role(&state.backend, role_arn).await.ok();
        crate::integrations::iam::ensure_service_account(client, &service.kube_namespace, role_arn).await?;
    }

    let secrets: Vec<_> = task_def
        .container_definitions
        .iter()
        .flat_map(|c| c.secrets.clone())
        .collect();
    if !secrets.is_empty() {
        crate::integrations::secrets::sync_secrets(client, &state.backend, &state.secrets_cache, &service.kube_namespace, &secrets).await?;
    }

    for cd in &task_def.container_definitions {
        if let Some(log_config) = &cd.log_configuration {
            if log_config.is_awslogs() {
                crate::integrations::cloudwatch_logs::ensure_log_group(&state.backend, &task_def.family, log_config).await.ok();
                crate::integrations::cloudwatch_logs::sync_collector_routing(client, &service.kube_namespace, &task_def.family, log_config).await?;
            }
        }
    }

    let (deployment, kube_service) = service_to_deployment_and_service(service, &task_def, &cluster);
    service_manager::apply(client, &service.kube_namespace, &deployment, &kube_service).await?;

    if !service.service_registries.is_empty() {
        let tasks = state.store.list_tasks_for_group(&service.cluster_arn.to_string(), &format!("service:{}", service.name))?;
        let addresses = crate::integrations::service_discovery::task_addresses(&tasks);
        for registry in &service.service_registries {
            if let Some(port) = registry.port {
                crate::integrations::service_discovery::sync_service_discovery(
                    client,
                    &service.kube_namespace,
                    &service.name,
                    port,
                    &addresses,
                )
                .await?;
            }
        }
    }

    Ok(())
}

pub async fn create_service(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "serviceName")?.to_string();
    let task_def_id = str_field(&body, "taskDefinition")?;
    let task_def = state.store.resolve_task_definition(task_def_id)?;

    let (kube_namespace, kube_deployment_name) = Service::derive_kube_names(&cluster.name, &cluster.region, &name);

    let mut service = Service {
        arn: Arn::service(&cluster.region, &cluster.account_id, &cluster.name, &name),
        name,
        cluster_arn: cluster.arn.clone(),
        task_definition_arn: task_def.arn.clone(),
        desired_count: super::util::u32_field(&body, "desiredCount", 0),
        running_count: 0,
        pending_count: 0,
        launch_type: parse_launch_type(opt_str(&body, "launchType")),
        platform_version: opt_str(&body, "platformVersion").map(str::to_string),
        scheduling_strategy: if opt_str(&body, "schedulingStrategy") == Some("DAEMON") {
            SchedulingStrategy::Daemon
        } else {
            SchedulingStrategy::Replica
        },
        status: ServiceStatus::Provisioning,
        load_balancers: parse_load_balancers(&body),
        service_registries: parse_service_registries(&body),
        network_configuration: parse_network_configuration(&body),
        deployment_configuration: body
            .get("deploymentConfiguration")
            .map(|d| DeploymentConfiguration {
                maximum_percent: d.get("maximumPercent").and_then(Value::as_u64).map(|v| v as u32).unwrap_or(200),
                minimum_healthy_percent: d.get("minimumHealthyPercent").and_then(Value::as_u64).map(|v| v as u32).unwrap_or(100),
            })
            .unwrap_or_default(),
        placement_constraints: Vec::new(),
        capacity_provider_strategy: Vec::new(),
        tags: tags_field(&body),
        health_check_grace_period_seconds: None,
        enable_execute_command: bool_field(&body, "enableExecuteCommand", false),
        propagate_tags: opt_str(&body, "propagateTags").map(str::to_string),
        kube_namespace,
        kube_deployment_name,
        created_at: Some(chrono::Utc::now()),
        updated_at: Some(chrono::Utc::now()),
    };

    state.store.create_service(&service)?;

    if !state.test_mode {
        if let Err(e) = apply_and_integrate(state, &service).await {
            service.status = ServiceStatus::Failed;
            state.store.update_service(&service)?;
            return Err(ApiError::Internal(e));
        }
    }

    let mut updated_cluster = cluster;
    updated_cluster.active_services_count = state.store.count_active_services(&updated_cluster.arn.to_string()).unwrap_or(0);
    state.store.update_cluster(&updated_cluster).ok();

    Ok(json!({ "service": to_json(&service) }))
}

pub async fn update_service(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "service")?;
    let mut service = state.store.get_service_by_name(&cluster.arn.to_string(), name)?;

    let mut shape_changed = false;
    if let Some(td_id) = opt_str(&body, "taskDefinition") {
        let td = state.store.resolve_task_definition(td_id)?;
        if td.arn != service.task_definition_arn {
            service.task_definition_arn = td.arn;
            shape_changed = true;
        }
    }
    if let Some(count) = body.get("desiredCount").and_then(Value::as_u64) {
        service.desired_count = count as u32;
    }
    if let Some(dc) = body.get("deploymentConfiguration") {
        let new_max = dc.get("maximumPercent").and_then(Value::as_u64).map(|v| v as u32);
        let new_min = dc.get("minimumHealthyPercent").and_then(Value::as_u64).map(|v| v as u32);
        if new_max.is_some() || new_min.is_some() {
            shape_changed = true;
        }
        if let Some(v) = new_max {
            service.deployment_configuration.maximum_percent = v;
        }
        if let Some(v) = new_min {
            service.deployment_configuration.minimum_healthy_percent = v;
        }
    }

    let previous = service.clone();
    service.status = ServiceStatus::Pending;
    service.updated_at = Some(chrono::Utc::now());
    state.store.update_service(&service)?;

    if !state.test_mode {
        let result = if shape_changed {
            apply_and_integrate(state, &service).await
        } else if let Ok(client) = state.kube_client() {
            service_manager::scale(client, &service.kube_namespace, &service.kube_deployment_name, service.desired_count as i32)
                .await
                .map_err(Into::into)
        } else {
            Ok(())
        };
        if let Err(e) = result {
            // Revert in-memory fields on Kubernetes failure (spec 4.3 UpdateService).
            state.store.update_service(&previous).ok();
            return Err(ApiError::Internal(e));
        }
    }

    service.status = ServiceStatus::Active;
    state.store.update_service(&service)?;
    Ok(json!({ "service": to_json(&service) }))
}

pub async fn delete_service(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "service")?;
    let force = bool_field(&body, "force", false);

    let mut service = state.store.get_service_by_name(&cluster.arn.to_string(), name)?;
    if service.desired_count > 0 && !force {
        return Err(ApiError::InvalidParameter(format!(
            "service {name} must be scaled to 0 (or deleted with force=true) before it can be deleted"
        )));
    }

    service.status = ServiceStatus::Draining;
    service.desired_count = 0;
    state.store.update_service(&service)?;

    if let Ok(client) = state.kube_client() {
        service_manager::delete(client, &service.kube_namespace, &service.kube_deployment_name)
            .await
            .map_err(ApiError::Internal)?;
    }

    state.store.delete_service(&service.arn.to_string())?;
    let mut updated_cluster = cluster;
    updated_cluster.active_services_count = state.store.count_active_services(&updated_cluster.arn.to_string()).unwrap_or(0);
    state.store.update_cluster(&updated_cluster).ok();

    Ok(json!({ "service": to_json(&service) }))
}

pub async fn describe_services(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let names = body
        .get("services")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut services = Vec::new();
    let mut failures = Vec::new();
    for name in names {
        match state.store.get_service_by_name(&cluster.arn.to_string(), &name) {
            Ok(s) => services.push(to_json(&s)),
            Err(_) => failures.push(json!({ "arn": name, "reason": "MISSING" })),
        }
    }
    Ok(json!({ "services": services, "failures": failures }))
}

pub async fn list_services(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let page = state.store.list_services(&cluster.arn.to_string(), after_field(&body), limit_field(&body, 100))?;
    Ok(json!({
        "serviceArns": page.items.iter().map(|s| s.arn.to_string()).collect::<Vec<_>>(),
        "nextToken": page.next_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_registries_from_request_body() {
        let body = json!({
            "serviceRegistries": [
                {"registryArn": "arn:aws:servicediscovery:us-east-1:1:service/srv-abc", "port": 80}
            ]
        });
        let registries = parse_service_registries(&body);
        assert_eq!(registries.len(), 1);
        assert_eq!(registries[0].port, Some(80));
    }

    #[test]
    fn parses_network_configuration_subnets_and_security_groups() {
        let body = json!({
            "networkConfiguration": {
                "awsvpcConfiguration": {
                    "subnets": ["subnet-a"],
                    "securityGroups": ["sg-a"],
                    "assignPublicIp": "ENABLED"
                }
            }
        });
        let nc = parse_network_configuration(&body).unwrap();
        let vpc = nc.awsvpc_configuration.unwrap();
        assert_eq!(vpc.subnets, vec!["subnet-a".to_string()]);
        assert_eq!(vpc.assign_public_ip.as_deref(), Some("ENABLED"));
    }

    #[test]
    fn missing_service_registries_yields_empty_vec() {
        assert!(parse_service_registries(&json!({})).is_empty());
    }
}
