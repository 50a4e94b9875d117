//! GCP Projects
//!
//! Project inventory sources and project discovery with fallback to the
//! currently configured project.

use super::client::GcpClient;
use crate::error::AncError;
use crate::resource::ProjectInventory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use tokio::process::Command;

/// Project information
#[derive(Debug, Clone)]
pub struct Project {
    pub project_id: String,
    pub name: String,
    pub lifecycle_state: String,
}

impl From<&Value> for Project {
    fn from(value: &Value) -> Self {
        Self {
            project_id: value
                .get("projectId")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            lifecycle_state: value
                .get("lifecycleState")
                .and_then(|v| v.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
        }
    }
}

/// List all accessible active GCP projects via Resource Manager
pub async fn list_projects(client: &GcpClient) -> Result<Vec<Project>> {
    let mut projects = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut url = client.resourcemanager_url("projects");
        if let Some(token) = &page_token {
            url = format!("{}?pageToken={}", url, urlencoding::encode(token));
        }

        let response = client.get(&url).await?;

        if let Some(arr) = response.get("projects").and_then(|v| v.as_array()) {
            projects.extend(
                arr.iter()
                    .map(Project::from)
                    .filter(|p| p.lifecycle_state == "ACTIVE"),
            );
        }

        match response
            .get("nextPageToken")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
        {
            Some(token) => page_token = Some(token.to_string()),
            None => break,
        }
    }

    tracing::debug!(
        "Resource Manager returned {} active projects: {}",
        projects.len(),
        projects
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(projects)
}

/// Parse newline-separated project ids, dropping blanks and duplicates
pub fn parse_project_ids(output: &str) -> Vec<String> {
    dedup_ids(output.lines().map(str::to_string))
}

fn dedup_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// Inventory backed by the Cloud Resource Manager API
pub struct ApiInventory {
    client: GcpClient,
    fallback: Option<String>,
}

impl ApiInventory {
    pub fn new(client: GcpClient, fallback: Option<String>) -> Self {
        Self { client, fallback }
    }
}

#[async_trait]
impl ProjectInventory for ApiInventory {
    async fn list_project_ids(&self) -> Result<Vec<String>> {
        let projects = list_projects(&self.client).await?;
        Ok(projects.into_iter().map(|p| p.project_id).collect())
    }

    async fn active_project(&self) -> Option<String> {
        self.fallback.clone()
    }
}

/// Inventory backed by the gcloud CLI
pub struct GcloudInventory {
    fallback: Option<String>,
}

impl GcloudInventory {
    pub fn new(fallback: Option<String>) -> Self {
        Self { fallback }
    }

    async fn gcloud(args: &[&str]) -> Result<String> {
        tracing::debug!("Executing: gcloud {}", args.join(" "));

        let output = Command::new("gcloud")
            .args(args)
            .output()
            .await
            .context("Failed to run gcloud")?;

        if !output.status.success() {
            anyhow::bail!(
                "gcloud {} exited with {}",
                args.join(" "),
                output.status.code().unwrap_or(-1)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ProjectInventory for GcloudInventory {
    async fn list_project_ids(&self) -> Result<Vec<String>> {
        let stdout = Self::gcloud(&["projects", "list", "--format=value(projectId)"]).await?;
        Ok(parse_project_ids(&stdout))
    }

    async fn active_project(&self) -> Option<String> {
        if let Some(project) = &self.fallback {
            return Some(project.clone());
        }
        match Self::gcloud(&["config", "get-value", "project"]).await {
            Ok(out) => Some(out.trim().to_string()).filter(|p| !p.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read gcloud active project: {}", e);
                None
            }
        }
    }
}

/// Resolve the set of projects to scan.
///
/// Falls back to the active project when the inventory fails or is empty.
pub async fn discover_projects(
    inventory: &dyn ProjectInventory,
) -> Result<Vec<String>, AncError> {
    match inventory.list_project_ids().await {
        Ok(ids) => {
            let ids = dedup_ids(ids);
            if !ids.is_empty() {
                tracing::info!("Loaded {} projects", ids.len());
                return Ok(ids);
            }
            tracing::warn!("No projects returned, using current project only");
        }
        Err(e) => {
            tracing::warn!("Failed to list projects: {:#}, using current project only", e);
        }
    }

    inventory
        .active_project()
        .await
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| vec![p])
        .ok_or(AncError::NoProjectsResolvable)
}
