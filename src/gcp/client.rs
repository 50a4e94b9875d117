//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::config::Endpoints;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client using Application Default Credentials
    pub async fn new(endpoints: Endpoints) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, endpoints)
    }

    /// Create a client from explicit credentials
    pub fn with_credentials(credentials: GcpCredentials, endpoints: Endpoints) -> Result<Self> {
        for (api, base) in [
            ("sqladmin", &endpoints.sqladmin),
            ("container", &endpoints.container),
            ("resourcemanager", &endpoints.resourcemanager),
            ("public_ip", &endpoints.public_ip),
        ] {
            Url::parse(base).with_context(|| format!("Invalid {} endpoint: {}", api, base))?;
        }

        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a PATCH request to a GCP API
    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.patch(url, &token, body).await
    }

    /// Make a PUT request to a GCP API
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.put(url, &token, body).await
    }

    // =========================================================================
    // Cloud SQL Admin API helpers
    // =========================================================================

    /// Build Cloud SQL Admin API URL
    pub fn sqladmin_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/sql/v1beta4/projects/{}/{}",
            self.endpoints.sqladmin,
            urlencoding::encode(project),
            path
        )
    }

    /// Build Cloud SQL instance URL
    pub fn sql_instance_url(&self, project: &str, instance: &str) -> String {
        self.sqladmin_url(
            project,
            &format!("instances/{}", urlencoding::encode(instance)),
        )
    }

    /// Build Cloud SQL operation URL
    pub fn sql_operation_url(&self, project: &str, operation: &str) -> String {
        self.sqladmin_url(
            project,
            &format!("operations/{}", urlencoding::encode(operation)),
        )
    }

    // =========================================================================
    // GKE API helpers
    // =========================================================================

    /// Build GKE API URL
    pub fn container_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.endpoints.container,
            urlencoding::encode(project),
            path
        )
    }

    /// Build GKE location URL (region, zone, or "-" for all locations)
    pub fn container_location_url(&self, project: &str, location: &str, resource: &str) -> String {
        self.container_url(
            project,
            &format!("locations/{}/{}", urlencoding::encode(location), resource),
        )
    }

    /// Build GKE cluster URL
    pub fn cluster_url(&self, project: &str, location: &str, cluster: &str) -> String {
        self.container_location_url(
            project,
            location,
            &format!("clusters/{}", urlencoding::encode(cluster)),
        )
    }

    /// Build GKE operation URL
    pub fn cluster_operation_url(&self, project: &str, location: &str, operation: &str) -> String {
        self.container_location_url(
            project,
            location,
            &format!("operations/{}", urlencoding::encode(operation)),
        )
    }

    // =========================================================================
    // Resource Manager API helpers
    // =========================================================================

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.resourcemanager, path)
    }
}
