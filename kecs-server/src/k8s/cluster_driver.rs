//! L1 Kubernetes Cluster Driver: creates/starts/stops/deletes a local
//! Kubernetes cluster, maps host ports to NodePorts, waits for readiness,
//! mounts host data directories (spec 2, 4.5 step 5).
//!
//! The real driver shells out to `kind` the way `ramparte-deployotron`'s
//! `AwsService` shells out to `docker` for image builds — a thin async
//! wrapper around `tokio::process::Command` rather than a bindings crate,
//! since `kind` has no stable Rust API of its own.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// A host port → NodePort mapping applied when the cluster is created.
#[derive(Debug, Clone, Copy)]
pub struct PortMapping {
    pub host_port: u16,
    pub node_port: u16,
}

#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Creates and starts a named cluster with the given port mappings and
    /// a host directory mounted for persistent data.
    async fn create_cluster(
        &self,
        name: &str,
        ports: &[PortMapping],
        data_dir: &Path,
        deadline: Duration,
    ) -> anyhow::Result<()>;

    /// Blocks (up to `deadline`) until the cluster's control plane and
    /// nodes report ready.
    async fn wait_ready(&self, name: &str, deadline: Duration) -> anyhow::Result<()>;

    async fn stop_cluster(&self, name: &str) -> anyhow::Result<()>;

    async fn delete_cluster(&self, name: &str) -> anyhow::Result<()>;

    /// Path to the kubeconfig granting access to the named cluster, used
    /// to build a `kube::Client`.
    async fn kubeconfig_path(&self, name: &str) -> anyhow::Result<std::path::PathBuf>;
}

/// Drives a local `kind` (Kubernetes-in-Docker) cluster.
pub struct KindClusterDriver {
    kecs_home: std::path::PathBuf,
}

impl KindClusterDriver {
    pub fn new(kecs_home: std::path::PathBuf) -> Self {
        KindClusterDriver { kecs_home }
    }

    fn cluster_config_path(&self, name: &str) -> std::path::PathBuf {
        self.kecs_home.join("instances").join(name).join("kind-config.yaml")
    }

    fn render_config(&self, ports: &[PortMapping], data_dir: &Path) -> String {
        let mut extra_port_mappings = String::new();
        for p in ports {
            extra_port_mappings.push_str(&format!(
                "  - containerPort: {}\n    hostPort: {}\n    protocol: TCP\n",
                p.node_port, p.host_port
            ));
        }
        format!(
            "kind: Cluster\napiVersion: kind.x-k8s.io/v1alpha4\nnodes:\n- role: control-plane\n  extraPortMappings:\n{extra_port_mappings}  extraMounts:\n  - hostPath: {}\n    containerPath: /kecs-data\n",
            data_dir.display()
        )
    }
}

#[async_trait]
impl ClusterDriver for KindClusterDriver {
    async fn create_cluster(
        &self,
        name: &str,
        ports: &[PortMapping],
        data_dir: &Path,
        deadline: Duration,
    ) -> anyhow::Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let config_path = self.cluster_config_path(name);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, self.render_config(ports, data_dir))?;

        let fut = Command::new("kind")
            .args(["create", "cluster", "--name", name, "--config"])
            .arg(&config_path)
            .output();

        let output = timeout(deadline, fut)
            .await
            .map_err(|_| anyhow::anyhow!("timed out creating kind cluster {name}"))??;

        if !output.status.success() {
            anyhow::bail!(
                "kind create cluster failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    async fn wait_ready(&self, name: &str, deadline: Duration) -> anyhow::Result<()> {
        let context = format!("kind-{name}");
        let fut = Command::new("kubectl")
            .args(["wait", "--for=condition=Ready", "nodes", "--all", "--context", &context, "--timeout"])
            .arg(format!("{}s", deadline.as_secs().max(1)))
            .output();
        let output = timeout(deadline, fut)
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for cluster {name} readiness"))??;
        if !output.status.success() {
            anyhow::bail!(
                "cluster {name} did not become ready: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    async fn stop_cluster(&self, name: &str) -> anyhow::Result<()> {
        let output = Command::new("docker")
            .args(["stop", &format!("{name}-control-plane")])
            .output()
            .await?;
        if !output.status.success() {
            tracing::warn!(name, "stopping cluster container reported non-zero exit");
        }
        Ok(())
    }

    async fn delete_cluster(&self, name: &str) -> anyhow::Result<()> {
        let output = Command::new("kind")
            .args(["delete", "cluster", "--name", name])
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!(
                "kind delete cluster failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    async fn kubeconfig_path(&self, name: &str) -> anyhow::Result<std::path::PathBuf> {
        let path = self.kecs_home.join("instances").join(name).join("kubeconfig");
        let output = Command::new("kind")
            .args(["get", "kubeconfig", "--name", name])
            .output()
            .await?;
        if !output.status.success() {
            anyhow::bail!(
                "kind get kubeconfig failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, output.stdout)?;
        Ok(path)
    }
}

/// Derives a NodePort in range for each host port, probing `taken` to
/// avoid collisions, per spec 9's open question: "derive any free NodePort
/// in 30000-32767 and record it."
pub fn allocate_node_ports(host_ports: &[u16], taken: &[u16]) -> Vec<PortMapping> {
    let mut taken: std::collections::HashSet<u16> = taken.iter().copied().collect();
    let mut out = Vec::with_capacity(host_ports.len());
    for &host_port in host_ports {
        let node_port = kecs_definitions::math::node_port_candidates(host_port)
            .find(|p| !taken.contains(p))
            .expect("30000-32767 range exhausted");
        taken.insert(node_port);
        out.push(PortMapping { host_port, node_port });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_node_ports_avoid_collisions() {
        let mappings = allocate_node_ports(&[5373, 5374], &[]);
        assert_ne!(mappings[0].node_port, mappings[1].node_port);
        for m in &mappings {
            assert!((30000..=32767).contains(&m.node_port));
        }
    }

    #[test]
    fn avoids_already_taken_ports() {
        let first = allocate_node_ports(&[5373], &[]);
        let second = allocate_node_ports(&[5373], &[first[0].node_port]);
        assert_ne!(first[0].node_port, second[0].node_port);
    }
}
