//! Binary entrypoint: the control-plane server itself, deployed into the
//! local Kubernetes cluster by the instance manager (spec 4.5 step 7) and
//! serving the ECS API / reverse proxy / admin HTTP surface from inside it.

use kecs_definitions::client::{BackendClient, BackendMode};
use kecs_definitions::config::{self, InstanceConfig};
use kecs_server::app_state::AppState;
use kecs_server::events;
use kecs_server::store::Store;
use std::sync::Arc;

fn backend_mode() -> BackendMode {
    if config::test_mode_enabled() {
        BackendMode::Test
    } else {
        BackendMode::Live
    }
}

fn load_config() -> InstanceConfig {
    let home = config::kecs_home();
    let name = std::env::var("KECS_INSTANCE_NAME").unwrap_or_else(|_| "default".to_string());
    let dir = config::instance_dir(&home, &name);
    config::load(&dir).unwrap_or_else(|_| InstanceConfig::new(&name, config::instance_data_dir(&home, &name)))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let instance_config = load_config();
    std::fs::create_dir_all(&instance_config.data_dir)?;

    let backend_url = std::env::var("KECS_BACKEND_URL").unwrap_or_else(|_| "http://localstack:4566/".to_string());
    let backend = BackendClient::new(&backend_url, backend_mode())?;

    let kube_client = match kube::Client::try_default().await {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(error = %e, "no Kubernetes client available, running with cluster integrations disabled");
            None
        }
    };

    let store = Store::open(&instance_config.data_dir)?;
    let state = AppState::new(store, backend.clone(), kube_client, instance_config.clone());

    let event_bus = state.event_bus.clone();
    actix_rt::spawn(events::poll_backend_events(backend, event_bus));

    tracing::info!(
        api_port = instance_config.api_port,
        admin_port = instance_config.admin_port,
        "starting kecs control plane"
    );

    actix_web::HttpServer::new(move || {
        actix_web::App::new()
            .app_data(actix_web::web::Data::new(state.clone()))
            .wrap(actix_web::middleware::Logger::default())
            .configure(kecs_server::router::configure)
    })
    .bind(("0.0.0.0", instance_config.api_port))?
    .run()
    .await?;

    Ok(())
}
