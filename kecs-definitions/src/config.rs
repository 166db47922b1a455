//! Instance configuration: ports, data directory, extra emulation services.
//!
//! Persisted as `<home>/.kecs/instances/<name>/config.json`.
//! Loading follows an env-var-first, explicit-override-second shape,
//! collected into one struct instead of scattered free functions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_PORT: u16 = 5373;
pub const DEFAULT_ADMIN_PORT: u16 = 5374;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub api_port: u16,
    pub admin_port: u16,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub extra_services: Vec<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account_id: String,
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>, data_dir: PathBuf) -> Self {
        InstanceConfig {
            name: name.into(),
            api_port: DEFAULT_API_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            data_dir,
            extra_services: Vec::new(),
            region: "us-east-1".to_string(),
            account_id: "000000000000".to_string(),
        }
    }
}

/// `KECS_HOME` resolution: explicit env var, else `~/.kecs`.
pub fn kecs_home() -> PathBuf {
    if let Ok(h) = std::env::var("KECS_HOME") {
        return PathBuf::from(h);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kecs")
}

pub fn instance_dir(home: &std::path::Path, name: &str) -> PathBuf {
    home.join("instances").join(name)
}

pub fn instance_data_dir(home: &std::path::Path, name: &str) -> PathBuf {
    instance_dir(home, name).join("data")
}

/// Whether Kubernetes/emulation side effects should be skipped
/// (`KECS_TEST_MODE`
/// the ECS API component, not a compile-time switch").
pub fn test_mode_enabled() -> bool {
    std::env::var("KECS_TEST_MODE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Write `config.json` atomically: write to a sibling temp file, then
/// rename over the destination so a crash mid-write never leaves a
/// truncated config behind.
pub fn save_atomically(config: &InstanceConfig, dir: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let final_path = dir.join("config.json");
    let tmp_path = dir.join(".config.json.tmp");
    let body = serde_json::to_vec_pretty(config)?;
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

pub fn load(dir: &std::path::Path) -> std::io::Result<InstanceConfig> {
    let body = std::fs::read(dir.join("config.json"))?;
    serde_json::from_slice(&body).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile_dir();
        let cfg = InstanceConfig::new("dev", dir.join("data"));
        save_atomically(&cfg, &dir).unwrap();
        let loaded = load(&dir).unwrap();
        assert_eq!(loaded.name, "dev");
        assert_eq!(loaded.api_port, DEFAULT_API_PORT);
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempfile_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("kecs-config-test-{}", uuid::Uuid::new_v4()));
        p
    }
}
