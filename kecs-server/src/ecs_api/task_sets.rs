use super::clusters;
use super::util::str_field;
use crate::app_state::AppState;
use kecs_definitions::error::Result;
use kecs_definitions::structs::task_set::{Scale, StabilityStatus, TaskSet, TaskSetStatus};
use kecs_definitions::Arn;
use serde_json::{json, Value};

fn to_json(ts: &TaskSet) -> Value {
    json!({
        "id": ts.id,
        "taskSetArn": ts.arn.to_string(),
        "serviceArn": ts.service_arn.to_string(),
        "clusterArn": ts.cluster_arn.to_string(),
        "status": match ts.status { TaskSetStatus::Primary => "PRIMARY", TaskSetStatus::Active => "ACTIVE", TaskSetStatus::Draining => "DRAINING" },
        "stabilityStatus": match ts.stability_status { StabilityStatus::Steady => "STEADY_STATE", StabilityStatus::Stabilizing => "STABILIZING" },
        "computedDesiredCount": ts.computed_desired_count,
        "runningCount": ts.running_count,
        "pendingCount": ts.pending_count,
    })
}

pub async fn create_task_set(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let service_name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), service_name)?;

    let id = format!("ecs-svc/{}", uuid::Uuid::new_v4());
    let task_set = TaskSet {
        id: id.clone(),
        arn: Arn::task_set(&cluster.region, &cluster.account_id, &cluster.name, service_name, &id),
        service_arn: service.arn.clone(),
        cluster_arn: cluster.arn.clone(),
        status: TaskSetStatus::Active,
        stability_status: StabilityStatus::Stabilizing,
        computed_desired_count: super::util::u32_field(&body, "scale", 0),
        running_count: 0,
        pending_count: 0,
        scale: Scale::default(),
        external_id: super::util::opt_str(&body, "externalId").map(str::to_string),
        launch_type: super::util::opt_str(&body, "launchType").map(str::to_string),
        is_primary: false,
    };
    state.store.create_task_set(&task_set)?;
    Ok(json!({ "taskSet": to_json(&task_set) }))
}

pub async fn delete_task_set(state: &AppState, body: Value) -> Result<Value> {
    let id = str_field(&body, "taskSet")?;
    let ts = state.store.get_task_set_by_arn(id)?;
    state.store.delete_task_set(&ts.arn.to_string())?;
    Ok(json!({ "taskSet": to_json(&ts) }))
}

pub async fn describe_task_sets(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let service_name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), service_name)?;
    let page = state.store.list_task_sets(&service.arn.to_string())?;
    Ok(json!({ "taskSets": page.items.iter().map(to_json).collect::<Vec<_>>() }))
}

pub async fn update_service_primary_task_set(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let service_name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), service_name)?;
    let primary_task_set = str_field(&body, "primaryTaskSet")?;
    state.store.set_primary_task_set(&service.arn.to_string(), primary_task_set)?;
    let ts = state.store.get_task_set_by_arn(primary_task_set)?;
    Ok(json!({ "taskSet": to_json(&ts) }))
}
