use super::clusters;
use super::util::{after_field, limit_field, opt_str, str_field};
use crate::app_state::AppState;
use crate::converters::pod_spec::{container_definitions_to_pod_spec, ContainerOverride, RunTaskOverrides};
use crate::k8s::managers::task as task_manager;
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::states::TaskLifecycle;
use kecs_definitions::structs::task::Task;
use kecs_definitions::Arn;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn to_json(t: &Task) -> Value {
    json!({
        "taskArn": t.arn.to_string(),
        "clusterArn": t.cluster_arn.to_string(),
        "taskDefinitionArn": t.task_definition_arn.to_string(),
        "lastStatus": t.last_status.as_aws_str(),
        "desiredStatus": t.desired_status.as_aws_str(),
        "group": t.group,
        "startedBy": t.started_by,
        "healthStatus": match t.health_status {
            kecs_definitions::structs::task::HealthStatus::Healthy => "HEALTHY",
            kecs_definitions::structs::task::HealthStatus::Unhealthy => "UNHEALTHY",
            kecs_definitions::structs::task::HealthStatus::Unknown => "UNKNOWN",
        },
        "startedAt": t.started_at,
        "stoppedAt": t.stopped_at,
        "stoppedReason": t.stopped_reason,
    })
}

fn parse_overrides(body: &Value) -> RunTaskOverrides {
    let container_overrides = body
        .get("overrides")
        .and_then(|o| o.get("containerOverrides"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|c| {
                    Some(ContainerOverride {
                        name: c.get("name")?.as_str()?.to_string(),
                        command: c.get("command").and_then(Value::as_array).map(|a| {
                            a.iter().filter_map(Value::as_str).map(str::to_string).collect()
                        }),
                        environment: c
                            .get("environment")
                            .and_then(Value::as_array)
                            .map(|a| {
                                a.iter()
                                    .filter_map(|e| {
                                        Some(kecs_definitions::structs::KeyValuePair {
                                            name: e.get("name")?.as_str()?.to_string(),
                                            value: e.get("value").and_then(Value::as_str).map(str::to_string),
                                        })
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    RunTaskOverrides { container_overrides }
}

/// Shared by `RunTask` and `StartTask`: creates task rows and, outside
/// test mode, materializes a bare Pod per task (spec 4.3).
async fn run_tasks(state: &AppState, body: Value, count: u32) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let task_def_id = str_field(&body, "taskDefinition")?;
    let task_def = state.store.resolve_task_definition(task_def_id)?;
    let started_by = opt_str(&body, "startedBy").map(str::to_string);
    let group = opt_str(&body, "group").map(str::to_string);
    let overrides = parse_overrides(&body);

    let mut tasks = Vec::new();
    for _ in 0..count.max(1) {
        let id = uuid::Uuid::new_v4();
        let mut task = Task {
            id,
            arn: Arn::task(&cluster.region, &cluster.account_id, &cluster.name, &id.to_string()),
            cluster_arn: cluster.arn.clone(),
            task_definition_arn: task_def.arn.clone(),
            last_status: TaskLifecycle::Provisioning,
            desired_status: TaskLifecycle::Running,
            launch_type: opt_str(&body, "launchType").map(str::to_string),
            started_by: started_by.clone(),
            group: group.clone(),
            cpu: task_def.cpu.clone(),
            memory: task_def.memory.clone(),
            containers: Vec::new(),
            started_at: None,
            stopped_at: None,
            stopped_reason: None,
            health_status: Default::default(),
            attachments: Vec::new(),
        };

        if state.test_mode {
            task.last_status = TaskLifecycle::Running;
            task.started_at = Some(chrono::Utc::now());
        } else if let Ok(client) = state.kube_client() {
            let mut labels = BTreeMap::new();
            labels.insert("kecs.io/cluster".to_string(), cluster.name.clone());
            labels.insert("kecs.io/task-id".to_string(), id.to_string());
            let pod_spec = container_definitions_to_pod_spec(&task_def, &overrides, None);
            let pod_name = format!("ecs-task-{id}");
            task_manager::run(client, &cluster.kube_namespace, &pod_name, labels, pod_spec)
                .await
                .map_err(ApiError::Internal)?;
            task.last_status = TaskLifecycle::Pending;
        }

        state.store.create_task(&task)?;
        tasks.push(task);
    }

    Ok(json!({ "tasks": tasks.iter().map(to_json).collect::<Vec<_>>(), "failures": [] }))
}

pub async fn run_task(state: &AppState, body: Value) -> Result<Value> {
    let count = super::util::u32_field(&body, "count", 1);
    run_tasks(state, body, count).await
}

pub async fn start_task(state: &AppState, body: Value) -> Result<Value> {
    let n = body
        .get("containerInstances")
        .and_then(Value::as_array)
        .map(|a| a.len() as u32)
        .unwrap_or(1);
    run_tasks(state, body, n).await
}

pub async fn stop_task(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let task_id = str_field(&body, "task")?;
    let arn = if task_id.starts_with("arn:aws:") {
        task_id.to_string()
    } else {
        Arn::task(&cluster.region, &cluster.account_id, &cluster.name, task_id).to_string()
    };
    let mut task = state.store.get_task_by_arn(&arn)?;
    task.desired_status = TaskLifecycle::Stopped;
    task.stopped_reason = opt_str(&body, "reason").map(str::to_string);

    if let Ok(client) = state.kube_client() {
        let pod_name = format!("ecs-task-{}", task.id);
        task_manager::stop(client, &cluster.kube_namespace, &pod_name).await.ok();
    }

    task.last_status = task.last_status.advance(TaskLifecycle::Stopped);
    task.stopped_at = Some(chrono::Utc::now());
    state.store.update_task(&task)?;
    Ok(json!({ "task": to_json(&task) }))
}

pub async fn describe_tasks(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let ids = body
        .get("tasks")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut tasks = Vec::new();
    let mut failures = Vec::new();
    for id in ids {
        let arn = if id.starts_with("arn:aws:") {
            id.clone()
        } else {
            Arn::task(&cluster.region, &cluster.account_id, &cluster.name, &id).to_string()
        };
        match state.store.get_task_by_arn(&arn) {
            Ok(t) => tasks.push(to_json(&t)),
            Err(_) => failures.push(json!({ "arn": arn, "reason": "MISSING" })),
        }
    }
    Ok(json!({ "tasks": tasks, "failures": failures }))
}

pub async fn list_tasks(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    if let Some(service_name) = opt_str(&body, "serviceName") {
        let tasks = state.store.list_tasks_for_group(&cluster.arn.to_string(), &format!("service:{service_name}"))?;
        return Ok(json!({ "taskArns": tasks.iter().map(|t| t.arn.to_string()).collect::<Vec<_>>(), "nextToken": Value::Null }));
    }
    let page = state.store.list_tasks(&cluster.arn.to_string(), after_field(&body), limit_field(&body, 100))?;
    Ok(json!({
        "taskArns": page.items.iter().map(|t| t.arn.to_string()).collect::<Vec<_>>(),
        "nextToken": page.next_token,
    }))
}
