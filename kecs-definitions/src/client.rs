//! HTTP client shared by every integration that talks to the co-deployed
//! AWS emulation backend.
//!
//! Grounded directly on `shipcat_definitions::vault::Vault`: a small
//! `reqwest`-backed client with a `Standard`/`Mocked`-style mode switch.
//! Here the switch is `KECS_TEST_MODE`: in `Test` mode no
//! network call is made and deterministic canned values are returned, so
//! integration tests and `RunTask`/`StartTask`'s "test mode" fast path
//! don't need a running backend.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Normal HTTP calls against the emulation backend.
    Live,
    /// No network calls; canned/deterministic responses.
    Test,
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    mode: BackendMode,
}

impl BackendClient {
    pub fn new(base_url: &str, mode: BackendMode) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid emulation backend URL: {base_url}"))?;
        Ok(BackendClient {
            http: reqwest::Client::new(),
            base_url,
            mode,
        })
    }

    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// 1s-timeout health probe against the backend.
    pub async fn healthy(&self) -> bool {
        if self.mode == BackendMode::Test {
            return true;
        }
        let url = match self.base_url.join("health") {
            Ok(u) => u,
            Err(_) => return false,
        };
        let resp = self
            .http
            .get(url)
            .timeout(std::time::Duration::from_secs(1))
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    /// POST a JSON body to the backend, targeted by `X-Amz-Target`, and
    /// deserialize a JSON response.
    pub async fn call<T: DeserializeOwned>(
        &self,
        amz_target: &str,
        body: &Value,
    ) -> Result<T> {
        if self.mode == BackendMode::Test {
            bail!("BackendClient::call invoked in test mode without a mock registered for {amz_target}");
        }
        let resp = self
            .http
            .post(self.base_url.clone())
            .header("X-Amz-Target", amz_target)
            .header("Content-Type", "application/x-amz-json-1.1")
            .json(body)
            .send()
            .await
            .with_context(|| format!("calling backend operation {amz_target}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("backend operation {amz_target} failed with {status}: {text}");
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding response for {amz_target}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mode_reports_healthy_without_network() {
        let client = BackendClient::new("http://127.0.0.1:1/", BackendMode::Test).unwrap();
        assert!(client.healthy().await);
    }
}
