use super::util::{after_field, limit_field, opt_str, str_field, tags_field};
use crate::app_state::AppState;
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::structs::task_definition::{
    ContainerDefinition, HealthCheck, KeyValuePair, LogConfiguration, MountPoint, PlacementConstraint, PortMapping,
    ProxyConfiguration, Secret, TaskDefinitionStatus, Volume,
};
use kecs_definitions::structs::TaskDefinition;
use kecs_definitions::Arn;
use serde_json::{json, Value};

fn parse_container(v: &Value) -> Result<ContainerDefinition> {
    Ok(ContainerDefinition {
        name: str_field(v, "name")?.to_string(),
        image: str_field(v, "image")?.to_string(),
        cpu: v.get("cpu").and_then(Value::as_u64).map(|x| x as u32),
        memory: v.get("memory").and_then(Value::as_u64).map(|x| x as u32),
        memory_reservation: v.get("memoryReservation").and_then(Value::as_u64).map(|x| x as u32),
        port_mappings: v
            .get("portMappings")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .map(|p| PortMapping {
                        container_port: p.get("containerPort").and_then(Value::as_u64).map(|x| x as u16),
                        host_port: p.get("hostPort").and_then(Value::as_u64).map(|x| x as u16),
                        protocol: p.get("protocol").and_then(Value::as_str).map(str::to_string),
                        name: p.get("name").and_then(Value::as_str).map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        environment: v
            .get("environment")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|e| {
                        Some(KeyValuePair {
                            name: e.get("name")?.as_str()?.to_string(),
                            value: e.get("value").and_then(Value::as_str).map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        secrets: v
            .get("secrets")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|s| {
                        Some(Secret {
                            name: s.get("name")?.as_str()?.to_string(),
                            value_from: s.get("valueFrom")?.as_str()?.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        mount_points: v
            .get("mountPoints")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| {
                        Some(MountPoint {
                            source_volume: m.get("sourceVolume")?.as_str()?.to_string(),
                            container_path: m.get("containerPath")?.as_str()?.to_string(),
                            read_only: m.get("readOnly").and_then(Value::as_bool).unwrap_or(false),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        health_check: v.get("healthCheck").map(|h| HealthCheck {
            command: h
                .get("command")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            interval: h.get("interval").and_then(Value::as_u64).map(|x| x as u32).unwrap_or(30),
            timeout: h.get("timeout").and_then(Value::as_u64).map(|x| x as u32).unwrap_or(5),
            retries: h.get("retries").and_then(Value::as_u64).map(|x| x as u32).unwrap_or(3),
            start_period: h.get("startPeriod").and_then(Value::as_u64).map(|x| x as u32),
        }),
        log_configuration: v.get("logConfiguration").map(|l| LogConfiguration {
            log_driver: l.get("logDriver").and_then(Value::as_str).unwrap_or_default().to_string(),
            options: l
                .get("options")
                .and_then(Value::as_object)
                .map(|m| {
                    m.iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect()
                })
                .unwrap_or_default(),
        }),
        depends_on: Vec::new(),
        essential: v.get("essential").and_then(Value::as_bool).unwrap_or(true),
        command: v
            .get("command")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
    })
}

fn to_json(td: &TaskDefinition) -> Value {
    json!({
        "taskDefinitionArn": td.arn.to_string(),
        "family": td.family,
        "revision": td.revision,
        "status": td.status.as_aws_str(),
        "networkMode": td.network_mode,
        "requiresCompatibilities": td.requires_compatibilities,
        "cpu": td.cpu,
        "memory": td.memory,
        "taskRoleArn": td.task_role_arn,
        "executionRoleArn": td.execution_role_arn,
        "tags": td.tags,
        "containerDefinitions": td.container_definitions.iter().map(|c| json!({
            "name": c.name,
            "image": c.image,
            "essential": c.essential,
        })).collect::<Vec<_>>(),
    })
}

pub async fn register_task_definition(state: &AppState, body: Value) -> Result<Value> {
    let family = str_field(&body, "family")?.to_string();
    let containers = body
        .get("containerDefinitions")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::InvalidParameter("containerDefinitions is required".to_string()))?
        .iter()
        .map(parse_container)
        .collect::<Result<Vec<_>>>()?;

    let revision = state.store.next_task_definition_revision(&family)?;
    let td = TaskDefinition {
        arn: Arn::task_definition(&state.config.region, &state.config.account_id, &family, revision),
        family,
        revision,
        status: TaskDefinitionStatus::Active,
        network_mode: opt_str(&body, "networkMode").map(str::to_string),
        requires_compatibilities: body
            .get("requiresCompatibilities")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        cpu: opt_str(&body, "cpu").map(str::to_string),
        memory: opt_str(&body, "memory").map(str::to_string),
        container_definitions: containers,
        volumes: body
            .get("volumes")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|v| {
                        Some(Volume {
                            name: v.get("name")?.as_str()?.to_string(),
                            host_path: v.get("host").and_then(|h| h.get("sourcePath")).and_then(Value::as_str).map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        task_role_arn: opt_str(&body, "taskRoleArn").map(str::to_string),
        execution_role_arn: opt_str(&body, "executionRoleArn").map(str::to_string),
        placement_constraints: body
            .get("placementConstraints")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(|c| {
                        Some(PlacementConstraint {
                            kind: c.get("type")?.as_str()?.to_string(),
                            expression: c.get("expression").and_then(Value::as_str).map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        proxy_configuration: body.get("proxyConfiguration").and_then(|p| {
            Some(ProxyConfiguration {
                kind: p.get("type").and_then(Value::as_str).map(str::to_string),
                container_name: p.get("containerName")?.as_str()?.to_string(),
                properties: Vec::new(),
            })
        }),
        tags: tags_field(&body),
    };
    state.store.create_task_definition(&td)?;
    Ok(json!({ "taskDefinition": to_json(&td) }))
}

pub async fn deregister_task_definition(state: &AppState, body: Value) -> Result<Value> {
    let identifier = str_field(&body, "taskDefinition")?;
    let td = state.store.resolve_task_definition(identifier)?;
    let td = state.store.deregister_task_definition(&td.arn.to_string())?;
    Ok(json!({ "taskDefinition": to_json(&td) }))
}

pub async fn describe_task_definition(state: &AppState, body: Value) -> Result<Value> {
    let identifier = str_field(&body, "taskDefinition")?;
    let td = state.store.resolve_task_definition(identifier)?;
    Ok(json!({ "taskDefinition": to_json(&td) }))
}

pub async fn list_task_definitions(state: &AppState, body: Value) -> Result<Value> {
    let family = opt_str(&body, "familyPrefix");
    let page = state
        .store
        .list_task_definitions(family, after_field(&body), limit_field(&body, 100))?;
    Ok(json!({
        "taskDefinitionArns": page.items.iter().map(|t| t.arn.to_string()).collect::<Vec<_>>(),
        "nextToken": page.next_token,
    }))
}

pub async fn list_task_definition_families(state: &AppState, _body: Value) -> Result<Value> {
    let families = state.store.list_task_definition_families()?;
    Ok(json!({ "families": families }))
}
