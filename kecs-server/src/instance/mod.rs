//! L4 Instance Manager: brings up a named environment end-to-end — cluster,
//! namespace, control-plane workloads, and tracks per-step status (spec
//! 4.5). Owns the restart and destroy paths too.

pub mod status;

pub use status::{InstanceStatus, InstanceStatusMap, StepState};

use crate::k8s::cluster_driver::{allocate_node_ports, ClusterDriver};
use crate::k8s::managers::{localstack, namespace, traefik, vector};
use kecs_definitions::config::{self, InstanceConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const STEPS: &[&str] = &[
    "name_resolution",
    "port_allocation",
    "data_directory",
    "save_config",
    "create_cluster",
    "create_namespace",
    "deploy_workloads",
    "wait_ready",
];

const ADJECTIVES: &[&str] = &["brave", "calm", "eager", "fuzzy", "quiet", "swift", "tidy", "wry"];
const NOUNS: &[&str] = &["otter", "finch", "cedar", "ridge", "comet", "delta", "harbor", "meadow"];

fn random_readable_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).unwrap();
    let noun = NOUNS.choose(&mut rng).unwrap();
    let suffix: u16 = rng.gen_range(0..10000);
    format!("{adjective}-{noun}-{suffix}")
}

pub struct InstanceManager {
    driver: Arc<dyn ClusterDriver>,
    home: PathBuf,
    statuses: Arc<InstanceStatusMap>,
    cluster_ready_deadline: Duration,
}

impl InstanceManager {
    pub fn new(driver: Arc<dyn ClusterDriver>, home: PathBuf, statuses: Arc<InstanceStatusMap>) -> Self {
        InstanceManager {
            driver,
            home,
            statuses,
            cluster_ready_deadline: Duration::from_secs(120),
        }
    }

    fn instance_dir(&self, name: &str) -> PathBuf {
        config::instance_dir(&self.home, name)
    }

    fn is_known(&self, name: &str) -> bool {
        self.instance_dir(name).join("config.json").exists()
    }

    /// Step 1-9 of spec 4.5. Returns the final config and a kube client on
    /// success; on fatal failure the failing step is marked and the
    /// in-progress status is left in place for diagnosis.
    pub async fn create(
        &self,
        requested_name: Option<String>,
        api_port: Option<u16>,
        admin_port: Option<u16>,
        extra_services: Vec<String>,
    ) -> anyhow::Result<(InstanceConfig, kube::Client)> {
        // Step 1: name resolution.
        let name = match requested_name {
            Some(n) if self.is_known(&n) => {
                anyhow::bail!("instance '{n}' already exists");
            }
            Some(n) => n,
            None => {
                let mut candidate = random_readable_name();
                while self.is_known(&candidate) {
                    candidate = random_readable_name();
                }
                candidate
            }
        };

        self.statuses.start(InstanceStatus::new(&name, STEPS));
        self.mark(&name, "name_resolution", StepState::Done, None);

        match self.create_inner(&name, api_port, admin_port, extra_services).await {
            Ok(result) => {
                self.statuses.update(&name, |s| s.ready = true);
                Ok(result)
            }
            Err(e) => {
                self.statuses.update(&name, |s| s.failed = true);
                Err(e)
            }
        }
    }

    async fn create_inner(
        &self,
        name: &str,
        api_port: Option<u16>,
        admin_port: Option<u16>,
        extra_services: Vec<String>,
    ) -> anyhow::Result<(InstanceConfig, kube::Client)> {
        // Step 2: port allocation.
        self.mark(name, "port_allocation", StepState::Running, None);
        let taken = self.ports_in_use();
        let api_port = api_port.unwrap_or(config::DEFAULT_API_PORT);
        let admin_port = admin_port.unwrap_or(config::DEFAULT_ADMIN_PORT);
        let api_port = next_free(api_port, &taken);
        let admin_port = next_free(admin_port, &taken.iter().chain([&api_port]).copied().collect::<Vec<_>>());
        let node_ports = allocate_node_ports(&[api_port, admin_port], &taken);
        self.mark(name, "port_allocation", StepState::Done, None);

        // Step 3: data directory.
        self.mark(name, "data_directory", StepState::Running, None);
        let data_dir = config::instance_data_dir(&self.home, name);
        create_data_dir(&data_dir)?;
        self.mark(name, "data_directory", StepState::Done, None);

        // Step 4: save config atomically.
        self.mark(name, "save_config", StepState::Running, None);
        let mut cfg = InstanceConfig::new(name, data_dir.clone());
        cfg.api_port = api_port;
        cfg.admin_port = admin_port;
        cfg.extra_services = extra_services;
        config::save_atomically(&cfg, &self.instance_dir(name))
            .map_err(|e| anyhow::anyhow!("saving instance config: {e}"))?;
        self.mark(name, "save_config", StepState::Done, None);

        // Step 5: cluster creation.
        self.mark(name, "create_cluster", StepState::Running, None);
        if let Err(e) = self
            .driver
            .create_cluster(name, &node_ports, &data_dir, self.cluster_ready_deadline)
            .await
        {
            self.mark(name, "create_cluster", StepState::Failed, Some(e.to_string()));
            return Err(e);
        }
        if let Err(e) = self.driver.wait_ready(name, self.cluster_ready_deadline).await {
            self.mark(name, "create_cluster", StepState::Failed, Some(e.to_string()));
            return Err(e);
        }
        self.mark(name, "create_cluster", StepState::Done, None);

        let kubeconfig_path = self.driver.kubeconfig_path(name).await?;
        let client = client_from_kubeconfig(&kubeconfig_path).await?;

        // Step 6: namespace creation.
        self.mark(name, "create_namespace", StepState::Running, None);
        let ns = format!("{name}-{}", cfg.region);
        if let Err(e) = namespace::ensure_namespace(&client, &ns).await {
            self.mark(name, "create_namespace", StepState::Failed, Some(e.to_string()));
            return Err(e);
        }
        self.mark(name, "create_namespace", StepState::Done, None);

        // Step 7: parallel deployment, collector failure non-fatal.
        self.mark(name, "deploy_workloads", StepState::Running, None);
        let (traefik_res, backend_res, vector_res) = tokio::join!(
            traefik::deploy(&client),
            localstack::deploy(&client, &ns, &cfg.extra_services),
            vector::deploy(&client, &ns),
        );
        if let Err(e) = traefik_res {
            self.mark(name, "deploy_workloads", StepState::Failed, Some(format!("ingress: {e}")));
            return Err(e);
        }
        if let Err(e) = backend_res {
            self.mark(
                name,
                "deploy_workloads",
                StepState::Failed,
                Some(format!("emulation backend: {e}")),
            );
            return Err(e);
        }
        if let Err(e) = vector_res {
            tracing::warn!(instance = name, error = %e, "log collector deployment failed, continuing");
        }
        self.mark(name, "deploy_workloads", StepState::Done, None);

        // Step 8: readiness wait.
        self.mark(name, "wait_ready", StepState::Running, None);
        if let Err(e) = self.wait_for_control_plane(&client).await {
            self.mark(name, "wait_ready", StepState::Failed, Some(e.to_string()));
            return Err(e);
        }
        self.mark(name, "wait_ready", StepState::Done, None);

        Ok((cfg, client))
    }

    async fn wait_for_control_plane(&self, client: &kube::Client) -> anyhow::Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
        loop {
            if traefik::is_healthy(client).await.unwrap_or(false) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("timed out waiting for ingress to become ready");
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Restart path: reuses saved config and the persistent data directory,
    /// skips port (re-)allocation (spec 4.5 "Restart path").
    pub async fn restart(&self, name: &str) -> anyhow::Result<(InstanceConfig, kube::Client)> {
        let cfg = config::load(&self.instance_dir(name)).map_err(|e| anyhow::anyhow!("loading instance config: {e}"))?;
        self.statuses.start(InstanceStatus::new(name, STEPS));
        for step in ["name_resolution", "port_allocation", "data_directory", "save_config"] {
            self.mark(name, step, StepState::Done, None);
        }

        let taken = self.ports_in_use();
        let node_ports = allocate_node_ports(&[cfg.api_port, cfg.admin_port], &taken);

        self.mark(name, "create_cluster", StepState::Running, None);
        self.driver
            .create_cluster(name, &node_ports, &cfg.data_dir, self.cluster_ready_deadline)
            .await?;
        self.driver.wait_ready(name, self.cluster_ready_deadline).await?;
        self.mark(name, "create_cluster", StepState::Done, None);

        let kubeconfig_path = self.driver.kubeconfig_path(name).await?;
        let client = client_from_kubeconfig(&kubeconfig_path).await?;

        let ns = format!("{name}-{}", cfg.region);
        self.mark(name, "create_namespace", StepState::Running, None);
        namespace::ensure_namespace(&client, &ns).await?;
        self.mark(name, "create_namespace", StepState::Done, None);

        self.mark(name, "deploy_workloads", StepState::Running, None);
        traefik::deploy(&client).await?;
        localstack::deploy(&client, &ns, &cfg.extra_services).await?;
        if let Err(e) = vector::deploy(&client, &ns).await {
            tracing::warn!(instance = name, error = %e, "log collector deployment failed, continuing");
        }
        self.mark(name, "deploy_workloads", StepState::Done, None);

        self.mark(name, "wait_ready", StepState::Running, None);
        self.wait_for_control_plane(&client).await?;
        self.mark(name, "wait_ready", StepState::Done, None);

        self.statuses.update(name, |s| s.ready = true);
        Ok((cfg, client))
    }

    /// Destroy: deletes the cluster and removes the instance directory.
    /// Directory removal failure is non-fatal (spec 4.5 "Destroy").
    pub async fn destroy(&self, name: &str) -> anyhow::Result<()> {
        self.driver.delete_cluster(name).await?;
        if let Err(e) = std::fs::remove_dir_all(self.instance_dir(name)) {
            tracing::warn!(instance = name, error = %e, "failed to remove instance directory");
        }
        self.statuses.remove(name);
        Ok(())
    }

    fn mark(&self, name: &str, step: &str, state: StepState, message: Option<String>) {
        self.statuses.update(name, |s| s.set_step(step, state, message));
    }

    /// Ports already claimed by other known instances, so port allocation
    /// doesn't collide with a sibling instance (spec 4.5 step 2).
    fn ports_in_use(&self) -> Vec<u16> {
        let mut ports = Vec::new();
        let instances_dir = self.home.join("instances");
        let Ok(entries) = std::fs::read_dir(&instances_dir) else {
            return ports;
        };
        for entry in entries.flatten() {
            if let Ok(cfg) = config::load(&entry.path()) {
                ports.push(cfg.api_port);
                ports.push(cfg.admin_port);
            }
        }
        ports
    }
}

/// Ports claimed for one instance's api/admin pair are spaced a full
/// `PORT_BLOCK_STRIDE` apart from the next instance's, not merely
/// incremented past whatever's taken — so instance B's pair lands clearly
/// past instance A's rather than squeezed in right after it (spec 8
/// scenario 5).
const PORT_BLOCK_STRIDE: u16 = 10;

fn next_free(preferred: u16, taken: &[u16]) -> u16 {
    let mut candidate = preferred;
    while taken
        .iter()
        .any(|&t| t >= candidate && t < candidate.saturating_add(PORT_BLOCK_STRIDE))
    {
        candidate = candidate.saturating_add(PORT_BLOCK_STRIDE);
    }
    candidate
}

fn create_data_dir(dir: &std::path::Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

async fn client_from_kubeconfig(path: &std::path::Path) -> anyhow::Result<kube::Client> {
    let contents = tokio::fs::read_to_string(path).await?;
    let kubeconfig = kube::config::Kubeconfig::from_yaml(&contents)?;
    let config = kube::Config::from_custom_kubeconfig(kubeconfig, &kube::config::KubeConfigOptions::default()).await?;
    Ok(kube::Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_free_steps_by_block_past_a_sibling_instances_ports() {
        assert_eq!(next_free(5373, &[5373, 5374]), 5383);
        assert_eq!(next_free(5373, &[]), 5373);
    }

    #[test]
    fn second_instance_pair_clears_first_by_a_full_block() {
        let taken = [5373u16, 5374];
        let api_port = next_free(5373, &taken);
        let admin_port = next_free(5374, &taken.iter().chain([&api_port]).copied().collect::<Vec<_>>());
        assert!(api_port >= 5383);
        assert!(admin_port >= 5384);
    }

    #[test]
    fn readable_names_are_distinct_across_calls() {
        let a = random_readable_name();
        let b = random_readable_name();
        assert!(a.contains('-'));
        // Not a strict guarantee, but collisions across two draws from a
        // combinatorial name space this size are vanishingly unlikely.
        assert_ne!(a, b);
    }
}
