//! HTTP-level integration tests against the `actix-web` test server,
//! exercising the scenarios in spec section 8.

use actix_web::{test, web, App};
use kecs_definitions::client::{BackendClient, BackendMode};
use kecs_definitions::config::InstanceConfig;
use kecs_server::store::Store;
use kecs_server::AppState;
use serde_json::{json, Value};

const TARGET: &str = "x-amz-target";

fn test_app_state() -> AppState {
    let store = Store::open_in_memory().expect("in-memory store");
    let backend = BackendClient::new("http://127.0.0.1:1/", BackendMode::Test).expect("backend client");
    let config = InstanceConfig::new("test-instance", std::env::temp_dir());
    AppState::new(store, backend, None, config)
}

/// Posts an ECS action to the test server and returns `(status, body)`.
/// A macro rather than a generic function, since the `actix-web` test
/// server's concrete service type is unnameable outside its own module.
macro_rules! ecs_call {
    ($app:expr, $action:expr, $body:expr $(,)?) => {{
        let req = test::TestRequest::post()
            .uri("/v1/")
            .insert_header((TARGET, format!("AmazonEC2ContainerServiceV20141113.{}", $action)))
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status().as_u16();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

/// Scenario 1: happy-path service lifecycle — create cluster, register a
/// task definition, create a service, update it to zero, delete it, and
/// confirm it no longer lists.
#[actix_rt::test]
async fn happy_path_service_lifecycle() {
    let state = test_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(kecs_server::router::configure),
    )
    .await;

    let (status, _) = ecs_call!(app, "CreateCluster", json!({"clusterName": "prod"}));
    assert_eq!(status, 200);

    let (status, body) = ecs_call!(
        app,
        "RegisterTaskDefinition",
        json!({
            "family": "web",
            "containerDefinitions": [{"name": "app", "image": "nginx:latest"}],
        }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["taskDefinition"]["revision"], 1);

    let (status, body) = ecs_call!(
        app,
        "CreateService",
        json!({
            "cluster": "prod",
            "serviceName": "web-svc",
            "taskDefinition": "web",
            "desiredCount": 2,
        }),
    );
    assert_eq!(status, 200);
    assert_eq!(body["service"]["desiredCount"], 2);
    assert_eq!(body["service"]["status"], "PROVISIONING");

    let (status, body) = ecs_call!(
        app,
        "DescribeServices",
        json!({"cluster": "prod", "services": ["web-svc"]}),
    );
    assert_eq!(status, 200);
    assert_eq!(body["services"][0]["serviceName"], "web-svc");

    let (status, body) = ecs_call!(
        app,
        "UpdateService",
        json!({"cluster": "prod", "service": "web-svc", "desiredCount": 0}),
    );
    assert_eq!(status, 200);
    assert_eq!(body["service"]["desiredCount"], 0);

    let (status, _) = ecs_call!(
        app,
        "DeleteService",
        json!({"cluster": "prod", "service": "web-svc"}),
    );
    assert_eq!(status, 200);

    let (status, body) = ecs_call!(app, "ListServices", json!({"cluster": "prod"}));
    assert_eq!(status, 200);
    assert!(body["serviceArns"].as_array().unwrap().is_empty());
}

/// Scenario 3: force delete with running tasks.
#[actix_rt::test]
async fn force_delete_required_when_desired_count_positive() {
    let state = test_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(kecs_server::router::configure),
    )
    .await;

    ecs_call!(app, "CreateCluster", json!({"clusterName": "prod"}));
    ecs_call!(
        app,
        "RegisterTaskDefinition",
        json!({"family": "web", "containerDefinitions": [{"name": "app", "image": "nginx:latest"}]}),
    );
    ecs_call!(
        app,
        "CreateService",
        json!({"cluster": "prod", "serviceName": "svc", "taskDefinition": "web", "desiredCount": 1}),
    );

    let (status, body) = ecs_call!(
        app,
        "DeleteService",
        json!({"cluster": "prod", "service": "svc"}),
    );
    assert_eq!(status, 400);
    assert_eq!(body["__type"], "InvalidParameterException");

    let (status, _) = ecs_call!(
        app,
        "DeleteService",
        json!({"cluster": "prod", "service": "svc", "force": true}),
    );
    assert_eq!(status, 200);

    let (status, _) = ecs_call!(
        app,
        "DeleteService",
        json!({"cluster": "prod", "service": "svc"}),
    );
    assert_eq!(status, 400, "second delete of the same service must report not-found");
}

/// Scenario 4: duplicate service creation in the same cluster is rejected.
#[actix_rt::test]
async fn duplicate_service_name_is_rejected() {
    let state = test_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(kecs_server::router::configure),
    )
    .await;

    ecs_call!(app, "CreateCluster", json!({"clusterName": "prod"}));
    ecs_call!(
        app,
        "RegisterTaskDefinition",
        json!({"family": "web", "containerDefinitions": [{"name": "app", "image": "nginx:latest"}]}),
    );

    let (status, _) = ecs_call!(
        app,
        "CreateService",
        json!({"cluster": "prod", "serviceName": "svc", "taskDefinition": "web", "desiredCount": 1}),
    );
    assert_eq!(status, 200);

    let (status, body) = ecs_call!(
        app,
        "CreateService",
        json!({"cluster": "prod", "serviceName": "svc", "taskDefinition": "web", "desiredCount": 1}),
    );
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().to_lowercase().contains("exist"));
}

/// `X-Amz-Target` prefixed for a non-ECS service falls through to the
/// reverse proxy rather than the ECS API, and in test mode (no live
/// backend) that surfaces as a 503 rather than a 404 or an ECS error body.
#[actix_rt::test]
async fn non_ecs_target_is_routed_to_the_proxy_not_the_ecs_api() {
    let state = test_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(kecs_server::router::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/v1/")
        .insert_header((TARGET, "DynamoDB_20120810.ListTables"))
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 503);
}

/// Registering two revisions for the same family yields dense, monotonic
/// revision numbers, and the family-only lookup used by `CreateService`
/// resolves to the latest active one.
#[actix_rt::test]
async fn task_definition_revisions_are_dense_and_monotonic() {
    let state = test_app_state();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(kecs_server::router::configure),
    )
    .await;

    let (_, first) = ecs_call!(
        app,
        "RegisterTaskDefinition",
        json!({"family": "web", "containerDefinitions": [{"name": "app", "image": "nginx:1"}]}),
    );
    assert_eq!(first["taskDefinition"]["revision"], 1);

    let (_, second) = ecs_call!(
        app,
        "RegisterTaskDefinition",
        json!({"family": "web", "containerDefinitions": [{"name": "app", "image": "nginx:2"}]}),
    );
    assert_eq!(second["taskDefinition"]["revision"], 2);

    ecs_call!(app, "CreateCluster", json!({"clusterName": "prod"}));
    let (status, body) = ecs_call!(
        app,
        "CreateService",
        json!({"cluster": "prod", "serviceName": "svc", "taskDefinition": "web", "desiredCount": 0}),
    );
    assert_eq!(status, 200);
    assert!(body["service"]["taskDefinition"]
        .as_str()
        .unwrap()
        .ends_with("web:2"));
}
