//! AWS JSON 1.1 dispatch for the ECS control-plane surface (spec 4.3).
//!
//! Requests arrive as `POST /` with an `X-Amz-Target` header of the form
//! `AmazonEC2ContainerServiceV20141113.<Action>`; the body is a bare JSON
//! object, never wrapped. Responses mirror the shape the AWS CLI/SDKs
//! expect; errors use the `{"__type": ..., "message": ...}` convention
//! (`kecs_definitions::error::ApiError`).

pub mod clusters;
pub mod deployments;
pub mod services;
pub mod task_definitions;
pub mod task_sets;
pub mod tasks;
mod util;

use crate::app_state::AppState;
use kecs_definitions::error::{ApiError, Result};
use serde_json::Value;

/// Strips the `AmazonEC2ContainerServiceV20141113.` prefix a real client
/// sends, tolerating a bare action name too (used by some test harnesses).
fn action_name(target: &str) -> &str {
    target.rsplit('.').next().unwrap_or(target)
}

pub async fn dispatch(state: &AppState, target: &str, body: Value) -> Result<Value> {
    match action_name(target) {
        "CreateCluster" => clusters::create_cluster(state, body).await,
        "DeleteCluster" => clusters::delete_cluster(state, body).await,
        "DescribeClusters" => clusters::describe_clusters(state, body).await,
        "ListClusters" => clusters::list_clusters(state, body).await,

        "RegisterTaskDefinition" => task_definitions::register_task_definition(state, body).await,
        "DeregisterTaskDefinition" => task_definitions::deregister_task_definition(state, body).await,
        "DescribeTaskDefinition" => task_definitions::describe_task_definition(state, body).await,
        "ListTaskDefinitions" => task_definitions::list_task_definitions(state, body).await,
        "ListTaskDefinitionFamilies" => task_definitions::list_task_definition_families(state, body).await,

        "CreateService" => services::create_service(state, body).await,
        "UpdateService" => services::update_service(state, body).await,
        "DeleteService" => services::delete_service(state, body).await,
        "DescribeServices" => services::describe_services(state, body).await,
        "ListServices" => services::list_services(state, body).await,

        "RunTask" => tasks::run_task(state, body).await,
        "StartTask" => tasks::start_task(state, body).await,
        "StopTask" => tasks::stop_task(state, body).await,
        "DescribeTasks" => tasks::describe_tasks(state, body).await,
        "ListTasks" => tasks::list_tasks(state, body).await,

        "CreateTaskSet" => task_sets::create_task_set(state, body).await,
        "DeleteTaskSet" => task_sets::delete_task_set(state, body).await,
        "DescribeTaskSets" => task_sets::describe_task_sets(state, body).await,
        "UpdateServicePrimaryTaskSet" => task_sets::update_service_primary_task_set(state, body).await,

        "DescribeServiceDeployments" => deployments::describe_service_deployments(state, body).await,
        "ListServiceDeployments" => deployments::list_service_deployments(state, body).await,
        "StopServiceDeployment" => deployments::stop_service_deployment(state, body).await,
        "DescribeServiceRevisions" => deployments::describe_service_revisions(state, body).await,

        other => Err(ApiError::InvalidParameter(format!("unsupported action: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_full_target_prefix() {
        assert_eq!(
            action_name("AmazonEC2ContainerServiceV20141113.CreateCluster"),
            "CreateCluster"
        );
        assert_eq!(action_name("CreateCluster"), "CreateCluster");
    }
}
