//! Shared application state wired once at startup and cloned (cheaply,
//! via internal `Arc`s) into every request handler.

use crate::events::EventBus;
use crate::instance::InstanceStatusMap;
use crate::integrations::secrets::SecretsCache;
use crate::store::Store;
use kecs_definitions::client::{BackendClient, BackendMode};
use kecs_definitions::config::InstanceConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub backend: BackendClient,
    pub kube_client: Option<kube::Client>,
    pub secrets_cache: Arc<SecretsCache>,
    pub instance_statuses: Arc<InstanceStatusMap>,
    pub event_bus: Arc<EventBus>,
    pub config: Arc<InstanceConfig>,
    pub test_mode: bool,
}

impl AppState {
    pub fn new(
        store: Store,
        backend: BackendClient,
        kube_client: Option<kube::Client>,
        config: InstanceConfig,
    ) -> Self {
        let test_mode = backend.mode() == BackendMode::Test;
        AppState {
            store,
            backend,
            kube_client,
            secrets_cache: Arc::new(SecretsCache::new()),
            instance_statuses: Arc::new(InstanceStatusMap::new()),
            event_bus: Arc::new(EventBus::new()),
            config: Arc::new(config),
            test_mode,
        }
    }

    /// Fails loudly rather than silently no-op'ing, since every caller of
    /// this accessor is on a path that requires a live cluster and
    /// `test_mode` is the only sanctioned way to skip it (spec 9).
    pub fn kube_client(&self) -> anyhow::Result<&kube::Client> {
        self.kube_client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no Kubernetes client configured (running in test mode?)"))
    }
}
