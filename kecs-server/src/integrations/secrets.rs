//! Secrets Manager / SSM → Kubernetes Secret sync (spec 4.6).
//!
//! Resolves each `secrets[].valueFrom` ARN against the emulation backend,
//! caches the value + version for a TTL, and creates/updates a Kubernetes
//! `Secret` with one data entry per `(ARN, optional JSON key)`.

use crate::converters::secret_naming::{parse_value_from, secrets_manager_secret_name, ssm_secret_name};
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kecs_definitions::client::{BackendClient, BackendMode};
use kecs_definitions::structs::task_definition::Secret as EcsSecret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CachedSecret {
    version: String,
    value: String,
    fetched_at: Instant,
}

/// Single-writer/multi-reader guarded cache of resolved secret values,
/// keyed by the raw `valueFrom` ARN (spec 5: "shared resource policy").
#[derive(Default)]
pub struct SecretsCache {
    inner: Mutex<HashMap<String, CachedSecret>>,
}

impl SecretsCache {
    pub fn new() -> Self {
        SecretsCache::default()
    }

    fn get_fresh(&self, key: &str) -> Option<CachedSecret> {
        let guard = self.inner.lock().unwrap();
        guard.get(key).and_then(|c| {
            if c.fetched_at.elapsed() < CACHE_TTL {
                Some(c.clone())
            } else {
                None
            }
        })
    }

    fn put(&self, key: String, value: CachedSecret) {
        self.inner.lock().unwrap().insert(key, value);
    }
}

async fn resolve_value(
    backend: &BackendClient,
    cache: &SecretsCache,
    value_from: &str,
    ssm: bool,
) -> anyhow::Result<(String, String)> {
    if let Some(cached) = cache.get_fresh(value_from) {
        return Ok((cached.value, cached.version));
    }

    if backend.mode() == BackendMode::Test {
        let version = "test".to_string();
        let value = format!("test-value-for-{value_from}");
        cache.put(
            value_from.to_string(),
            CachedSecret {
                version: version.clone(),
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );
        return Ok((value, version));
    }

    let (operation, body) = if ssm {
        let (name, _) = parse_value_from(value_from);
        ("AmazonSSM.GetParameter", serde_json::json!({"Name": name, "WithDecryption": true}))
    } else {
        let (name, _) = parse_value_from(value_from);
        (
            "secretsmanager.GetSecretValue",
            serde_json::json!({"SecretId": name}),
        )
    };

    let resp: serde_json::Value = backend.call(operation, &body).await?;
    let (value, version) = if ssm {
        (
            resp["Parameter"]["Value"].as_str().unwrap_or_default().to_string(),
            resp["Parameter"]["Version"].to_string(),
        )
    } else {
        (
            resp["SecretString"].as_str().unwrap_or_default().to_string(),
            resp["VersionId"].as_str().unwrap_or_default().to_string(),
        )
    };

    cache.put(
        value_from.to_string(),
        CachedSecret {
            version: version.clone(),
            value: value.clone(),
            fetched_at: Instant::now(),
        },
    );
    Ok((value, version))
}

/// Resolves `secrets`, grouping entries by derived Kubernetes Secret name,
/// and applies the resulting `Secret` objects into `namespace`.
pub async fn sync_secrets(
    client: &Client,
    backend: &BackendClient,
    cache: &SecretsCache,
    namespace: &str,
    secrets: &[EcsSecret],
) -> anyhow::Result<()> {
    let mut by_kube_name: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

    for secret in secrets {
        let (kube_name, ssm) = if secret.is_secrets_manager() {
            (secrets_manager_secret_name(&secret.value_from), false)
        } else if secret.is_ssm() {
            (ssm_secret_name(&secret.value_from), true)
        } else {
            continue;
        };
        let (value, _version) = resolve_value(backend, cache, &secret.value_from, ssm).await?;
        let (_, json_key) = parse_value_from(&secret.value_from);
        let data_key = json_key.unwrap_or_else(|| secret.name.clone());
        by_kube_name.entry(kube_name).or_default().insert(data_key, value);
    }

    let api: Api<KubeSecret> = Api::namespaced(client.clone(), namespace);
    for (name, data) in by_kube_name {
        let secret = KubeSecret {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            string_data: Some(data),
            ..Default::default()
        };
        api.patch(&name, &PatchParams::apply("kecs").force(), &Patch::Apply(&secret))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mode_resolves_deterministic_value_without_network() {
        let backend = BackendClient::new("http://127.0.0.1:1/", BackendMode::Test).unwrap();
        let cache = SecretsCache::new();
        let (value, version) = resolve_value(
            &backend,
            &cache,
            "arn:aws:secretsmanager:us-east-1:1:secret:db-pw",
            false,
        )
        .await
        .unwrap();
        assert_eq!(version, "test");
        assert!(value.contains("db-pw"));
    }

    #[tokio::test]
    async fn cache_hit_skips_resolution() {
        let backend = BackendClient::new("http://127.0.0.1:1/", BackendMode::Test).unwrap();
        let cache = SecretsCache::new();
        let key = "arn:aws:secretsmanager:us-east-1:1:secret:db-pw";
        let (first, _) = resolve_value(&backend, &cache, key, false).await.unwrap();
        let (second, _) = resolve_value(&backend, &cache, key, false).await.unwrap();
        assert_eq!(first, second);
    }
}
