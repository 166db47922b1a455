//! L3 HTTP multiplexer: classifies inbound requests and dispatches to the
//! ECS API, the reverse proxy, the static UI, or the operational endpoints
//! (spec 4.4).

use crate::app_state::AppState;
use crate::{ecs_api, events, proxy};
use actix_web::{web, HttpRequest, HttpResponse};
use kecs_definitions::error::ApiError;

/// `POST /v1/` — ECS API surface. Reached only when the classifier in
/// [`ecs_entrypoint`] has already confirmed an `X-Amz-Target` beginning
/// `AmazonEC2ContainerServiceV`.
async fn ecs_api_handler(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let target = req
        .headers()
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let parsed: serde_json::Value = if body.is_empty() {
        serde_json::json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => return error_response(&ApiError::InvalidParameter(format!("invalid JSON body: {e}"))),
        }
    };

    match ecs_api::dispatch(&state, target, parsed).await {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

fn error_response(err: &ApiError) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(err.status_code()).unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(serde_json::json!({
        "__type": err.aws_type(),
        "message": err.to_string(),
    }))
}

/// `POST /v1/` entrypoint: classification precedence step 1 requires the
/// path AND the ECS target prefix, so anything reaching here that fails
/// the header check falls through to the reverse proxy (step 2).
async fn v1_entrypoint(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    let is_ecs = req
        .headers()
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| t.starts_with("AmazonEC2ContainerServiceV"));

    if is_ecs {
        ecs_api_handler(state, req, body).await
    } else {
        proxy::forward(&state.backend, req, body).await
    }
}

/// Any other path: reverse-proxy candidates (step 2), else 404 (handled by
/// the caller registering this only as a catch-all fallback after `/ui`,
/// `/health`, `/metrics`, `/localstack`, `/ws` are matched).
async fn fallback(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
    if proxy::looks_like_non_ecs_aws_request(&req) {
        return proxy::forward(&state.backend, req, body).await;
    }
    HttpResponse::NotFound().json(serde_json::json!({
        "__type": "ClientException",
        "message": "no route matched this request",
    }))
}

/// `/ui/*` — serves the SPA if a build has been mounted; otherwise reports
/// the UI as not installed rather than 500ing (spec 4.4 step 3, out of
/// scope per spec 1's "static asset serving" Non-goal: we route the path,
/// we don't bundle a frontend).
async fn ui_handler() -> HttpResponse {
    HttpResponse::NotFound().body("kecs UI is not bundled with this control plane build")
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    if state.backend.healthy().await {
        HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({"status": "unavailable"}))
    }
}

async fn metrics() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain; version=0.0.4").body("")
}

async fn localstack_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "running": state.backend.healthy().await,
        "services": {},
    }))
}

async fn localstack_dashboard(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "backend": state.backend.base_url().to_string(),
    }))
}

/// `/ws` — subscribes the connecting UI client to [`events::EventBus`] and
/// forwards every published event as a JSON text frame until it
/// disconnects.
async fn ws_events(
    state: web::Data<AppState>,
    req: HttpRequest,
    stream: web::Payload,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    let mut rx = state.event_bus.subscribe();

    actix_rt::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Ok(event) => {
                            if session.text(event.to_message().to_string()).await.is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                msg = futures::StreamExt::next(&mut msg_stream) => {
                    match msg {
                        Some(Ok(actix_ws::Message::Close(_))) | None => break,
                        Some(Ok(actix_ws::Message::Ping(bytes))) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(_)) => break,
                        _ => {}
                    }
                }
            }
        }
        let _ = session.close(None).await;
    });

    Ok(response)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/v1/", web::post().to(v1_entrypoint))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics))
        .route("/localstack/status", web::get().to(localstack_status))
        .route("/localstack/dashboard", web::get().to(localstack_dashboard))
        .route("/ws", web::get().to(ws_events))
        .route("/ui/{path:.*}", web::get().to(ui_handler))
        .default_service(web::route().to(fallback));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppState;
    use crate::store::Store;
    use actix_web::{test, App};
    use kecs_definitions::client::{BackendClient, BackendMode};
    use kecs_definitions::config::InstanceConfig;

    fn test_state() -> AppState {
        let store = Store::open_in_memory().unwrap();
        let backend = BackendClient::new("http://127.0.0.1:1/", BackendMode::Test).unwrap();
        let config = InstanceConfig::new("test", std::env::temp_dir());
        AppState::new(store, backend, None, config)
    }

    #[actix_rt::test]
    async fn health_reports_ok_in_test_mode() {
        let app = test::init_service(App::new().app_data(web::Data::new(test_state())).configure(configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn unmatched_path_is_not_found() {
        let app = test::init_service(App::new().app_data(web::Data::new(test_state())).configure(configure)).await;
        let req = test::TestRequest::get().uri("/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_rt::test]
    async fn ecs_create_cluster_round_trips_through_v1() {
        let app = test::init_service(App::new().app_data(web::Data::new(test_state())).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/v1/")
            .insert_header(("x-amz-target", "AmazonEC2ContainerServiceV20141113.CreateCluster"))
            .set_json(serde_json::json!({"clusterName": "demo"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
