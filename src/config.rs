//! Configuration Management
//!
//! Handles persistent configuration storage for tanc.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on concurrent list calls during discovery
pub const MAX_DISCOVERY_CONCURRENCY: usize = 20;

/// Where the list of accessible projects comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InventorySource {
    /// Cloud Resource Manager API
    #[default]
    Api,
    /// `gcloud projects list`
    Gcloud,
}

/// Base URLs of the APIs used by tanc
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub sqladmin: String,
    pub container: String,
    pub resourcemanager: String,
    /// Plain-text "what is my IP" service
    pub public_ip: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sqladmin: "https://sqladmin.googleapis.com".to_string(),
            container: "https://container.googleapis.com".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".to_string(),
            public_ip: "https://ipinfo.io/ip".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every Google API at one base URL (mock servers)
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            sqladmin: base.clone(),
            container: base.clone(),
            resourcemanager: base.clone(),
            public_ip: format!("{}/ip", base),
        }
    }
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project used when the inventory yields nothing
    pub project_id: Option<String>,
    pub inventory: InventorySource,
    pub max_concurrency: usize,
    pub poll_interval_secs: u64,
    pub operation_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            inventory: InventorySource::Api,
            max_concurrency: MAX_DISCOVERY_CONCURRENCY,
            poll_interval_secs: 5,
            operation_timeout_secs: 30,
            discovery_timeout_secs: 120,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tanc").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse configuration, falling back to defaults on malformed content
    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config: {}", e);
            Self::default()
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective fallback project (CLI > config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.save()
    }

    /// Discovery width, clamped to 1..=20
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.clamp(1, MAX_DISCOVERY_CONCURRENCY)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.concurrency(), 20);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.operation_timeout(), Duration::from_secs(30));
        assert_eq!(config.inventory, InventorySource::Api);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_json(r#"{"project_id":"my-project","inventory":"gcloud"}"#);
        assert_eq!(config.project_id.as_deref(), Some("my-project"));
        assert_eq!(config.inventory, InventorySource::Gcloud);
        assert_eq!(config.operation_timeout_secs, 30);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let config = Config::from_json("{not json");
        assert!(config.project_id.is_none());
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let mut config = Config::default();
        config.max_concurrency = 64;
        assert_eq!(config.concurrency(), 20);
        config.max_concurrency = 0;
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_with_base_endpoints() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9000/");
        assert_eq!(endpoints.sqladmin, "http://127.0.0.1:9000");
        assert_eq!(endpoints.public_ip, "http://127.0.0.1:9000/ip");
    }
}
