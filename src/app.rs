//! Application facade
//!
//! The three operations a front-end needs: discover, fetch detail, add a
//! network. Each call goes to the backends; nothing is cached between calls.

use crate::config::Config;
use crate::error::{AncError, AncResult};
use crate::gcp::client::GcpClient;
use crate::gcp::http::{format_gcp_error, GcpHttpClient};
use crate::resource::{
    self, AddNetworkOutcome, Backends, CatalogOptions, CloudResource, MutationOptions, Snapshot,
};
use anyhow::{Context, Result};

/// Engine entry points shared by every front-end
pub struct App {
    backends: Backends,
    catalog: CatalogOptions,
    mutation: MutationOptions,
    http: GcpHttpClient,
    public_ip_url: String,
}

impl App {
    /// Build an app talking to GCP with Application Default Credentials
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = GcpClient::new(config.endpoints.clone())
            .await
            .context("Failed to connect to GCP")?;
        let http = client.http.clone();
        let backends = Backends::gcp(client, config);
        Ok(Self::with_backends(backends, config, http))
    }

    /// Build an app on explicit backends
    pub fn with_backends(backends: Backends, config: &Config, http: GcpHttpClient) -> Self {
        Self {
            backends,
            catalog: CatalogOptions {
                max_concurrency: config.concurrency(),
                deadline: config.discovery_timeout(),
            },
            mutation: MutationOptions {
                poll_interval: config.poll_interval(),
                deadline: config.operation_timeout(),
            },
            http,
            public_ip_url: config.endpoints.public_ip.clone(),
        }
    }

    /// Override polling cadence (tests, slow backends)
    pub fn with_mutation_options(mut self, options: MutationOptions) -> Self {
        self.mutation = options;
        self
    }

    /// List every SQL instance and GKE cluster across accessible projects
    pub async fn discover(&self) -> AncResult<Snapshot> {
        resource::list_all_resources(&self.backends, self.catalog).await
    }

    /// Re-read one resource from its backend
    pub async fn fetch_detail(&self, resource: &CloudResource) -> AncResult<CloudResource> {
        resource::fetch_detail(&self.backends, resource).await
    }

    /// Authorize `value` (an address or CIDR) on `resource` under `name`
    pub async fn add_network(
        &self,
        resource: &CloudResource,
        name: &str,
        value: &str,
    ) -> AncResult<AddNetworkOutcome> {
        resource::add_network(&self.backends, self.mutation, resource, name, value).await
    }

    /// Caller's public address as a /32, for pre-filling the add form
    pub async fn detect_public_ip(&self) -> AncResult<String> {
        let body = self
            .http
            .get_text(&self.public_ip_url)
            .await
            .map_err(|e| AncError::Backend(format_gcp_error(&e)))?;

        let ip = body.trim();
        if ip.is_empty() {
            return Err(AncError::Backend(
                "Public IP service returned an empty response".to_string(),
            ));
        }
        Ok(resource::normalize_cidr(ip))
    }
}

/// Default display name for a new network: the local user name
pub fn default_network_name() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_default()
}
