//! GKE (Container) API
//!
//! Wire types for the `container/v1` REST surface and the [`ClusterBackend`]
//! implementation on [`GcpClient`].

use super::client::GcpClient;
use super::operations::OperationStatus;
use crate::resource::{normalize_cidr, AuthorizedNetwork, Cluster, ClusterBackend};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GkeCluster {
    pub name: String,
    pub location: String,
    pub status: String,
    pub endpoint: String,
    pub private_cluster_config: Option<PrivateClusterConfig>,
    pub master_authorized_networks_config: Option<MasterAuthorizedNetworksConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateClusterConfig {
    pub enable_private_nodes: bool,
    pub private_endpoint: String,
    pub public_endpoint: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterAuthorizedNetworksConfig {
    pub enabled: bool,
    pub cidr_blocks: Vec<CidrBlock>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CidrBlock {
    pub display_name: String,
    pub cidr_block: String,
}

impl From<&AuthorizedNetwork> for CidrBlock {
    fn from(network: &AuthorizedNetwork) -> Self {
        Self {
            display_name: network.display_name.clone(),
            cidr_block: network.cidr_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ClustersListResponse {
    clusters: Vec<GkeCluster>,
    missing_zones: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GkeOperation {
    pub name: String,
    pub status: String,
    pub status_message: String,
    pub error: Option<RpcStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpcStatus {
    pub code: i32,
    pub message: String,
}

impl GkeOperation {
    pub fn status(&self) -> OperationStatus {
        let error = self.error.as_ref().map(|e| {
            if !e.message.is_empty() {
                e.message.clone()
            } else if !self.status_message.is_empty() {
                self.status_message.clone()
            } else {
                format!("error code {}", e.code)
            }
        });
        OperationStatus::from_parts(&self.status, error)
    }
}

impl GkeCluster {
    /// Convert to the domain model.
    /// Stored blocks are kept even while master authorized networks are disabled;
    /// the update re-enables the feature with them.
    pub fn into_resource(self, project: &str) -> Cluster {
        let (private_cluster_enabled, private_endpoint, public_endpoint) =
            match self.private_cluster_config {
                Some(pcc) => (pcc.enable_private_nodes, pcc.private_endpoint, pcc.public_endpoint),
                None => (false, String::new(), self.endpoint.clone()),
            };

        let config = self.master_authorized_networks_config.unwrap_or_default();
        let enabled = config.enabled;
        let master_authorized_networks = config
            .cidr_blocks
            .into_iter()
            .map(|block| AuthorizedNetwork {
                display_name: block.display_name,
                cidr_value: normalize_cidr(&block.cidr_block),
            })
            .collect();

        Cluster {
            name: self.name,
            project: project.to_string(),
            location: self.location,
            status: self.status,
            endpoint: self.endpoint,
            private_cluster_enabled,
            private_endpoint,
            public_endpoint,
            master_authorized_networks_enabled: enabled,
            master_authorized_networks,
        }
    }
}

/// PUT body enabling master authorized networks with the given blocks
pub fn master_authorized_networks_update(networks: &[AuthorizedNetwork]) -> serde_json::Value {
    let blocks: Vec<CidrBlock> = networks.iter().map(CidrBlock::from).collect();
    json!({
        "update": {
            "desiredMasterAuthorizedNetworksConfig": {
                "enabled": true,
                "cidrBlocks": blocks
            }
        }
    })
}

#[async_trait]
impl ClusterBackend for GcpClient {
    async fn list_clusters(&self, project: &str) -> Result<Vec<Cluster>> {
        let url = self.container_location_url(project, "-", "clusters");
        let response = self
            .get(&url)
            .await
            .with_context(|| format!("Failed to list GKE clusters in project {}", project))?;
        let list: ClustersListResponse =
            serde_json::from_value(response).context("Unexpected GKE cluster list format")?;

        if !list.missing_zones.is_empty() {
            tracing::warn!(
                "GKE list for {} is missing zones: {}",
                project,
                list.missing_zones.join(", ")
            );
        }

        Ok(list
            .clusters
            .into_iter()
            .map(|c| c.into_resource(project))
            .collect())
    }

    async fn get_cluster(&self, project: &str, location: &str, name: &str) -> Result<Cluster> {
        let response = self
            .get(&self.cluster_url(project, location, name))
            .await
            .context("Failed to get GKE cluster details")?;
        let mut cluster: GkeCluster =
            serde_json::from_value(response).context("Unexpected GKE cluster format")?;
        if cluster.location.is_empty() {
            cluster.location = location.to_string();
        }
        Ok(cluster.into_resource(project))
    }

    async fn update_master_authorized_networks(
        &self,
        project: &str,
        location: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String> {
        let body = master_authorized_networks_update(networks);
        let response = self
            .put(&self.cluster_url(project, location, name), &body)
            .await
            .context("Failed to update cluster")?;
        let operation: GkeOperation =
            serde_json::from_value(response).context("Unexpected GKE operation format")?;

        if operation.name.is_empty() {
            anyhow::bail!("GKE API returned an operation without a name");
        }
        Ok(operation.name)
    }

    async fn get_operation(
        &self,
        project: &str,
        location: &str,
        operation: &str,
    ) -> Result<OperationStatus> {
        let response = self
            .get(&self.cluster_operation_url(project, location, operation))
            .await
            .context("Failed to get operation status")?;
        let operation: GkeOperation =
            serde_json::from_value(response).context("Unexpected GKE operation format")?;
        Ok(operation.status())
    }
}
