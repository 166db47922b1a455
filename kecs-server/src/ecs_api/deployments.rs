use super::clusters;
use super::util::str_field;
use crate::app_state::AppState;
use kecs_definitions::error::Result;
use kecs_definitions::structs::Service;
use serde_json::{json, Value};

/// Synthesizes a single deployment snapshot from a service's current state
/// (spec open question ii: no separate deployment-history table is kept).
fn current_deployment_json(service: &Service) -> Value {
    json!({
        "id": format!("ecs-svc/{}", service.name),
        "status": "PRIMARY",
        "taskDefinition": service.task_definition_arn.to_string(),
        "desiredCount": service.desired_count,
        "runningCount": service.running_count,
        "pendingCount": service.pending_count,
        "createdAt": service.created_at,
        "updatedAt": service.updated_at,
        "rolloutState": "COMPLETED",
    })
}

pub async fn describe_service_deployments(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), name)?;
    Ok(json!({ "serviceDeployments": [current_deployment_json(&service)] }))
}

pub async fn list_service_deployments(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), name)?;
    Ok(json!({
        "serviceDeployments": [current_deployment_json(&service)],
        "nextToken": Value::Null,
    }))
}

pub async fn stop_service_deployment(state: &AppState, body: Value) -> Result<Value> {
    let cluster_id = super::util::cluster_field(&body);
    let cluster = clusters::resolve(state, &cluster_id)?;
    let name = str_field(&body, "service")?;
    let service = state.store.get_service_by_name(&cluster.arn.to_string(), name)?;
    let mut deployment = current_deployment_json(&service);
    deployment["status"] = json!("STOPPED");
    deployment["rolloutState"] = json!("STOPPED");
    Ok(json!({ "serviceDeployment": deployment }))
}

pub async fn describe_service_revisions(state: &AppState, body: Value) -> Result<Value> {
    let arns = body
        .get("serviceRevisionArns")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    let mut revisions = Vec::new();
    let mut failures = Vec::new();
    for arn in arns {
        let name = arn.rsplit('/').next().unwrap_or(&arn);
        let cluster_id = super::util::cluster_field(&body);
        match clusters::resolve(state, &cluster_id).and_then(|c| state.store.get_service_by_name(&c.arn.to_string(), name)) {
            Ok(service) => revisions.push(json!({
                "serviceRevisionArn": arn,
                "serviceArn": service.arn.to_string(),
                "taskDefinition": service.task_definition_arn.to_string(),
                "createdAt": service.created_at,
            })),
            Err(_) => failures.push(json!({ "arn": arn, "reason": "MISSING" })),
        }
    }
    Ok(json!({ "serviceRevisions": revisions, "failures": failures }))
}
