//! Backend seams
//!
//! The catalog, detail and mutation code only talk to GCP through these
//! traits; [`GcpClient`] implements them over REST.

use super::model::{AuthorizedNetwork, Cluster, DatabaseInstance};
use crate::config::{Config, InventorySource};
use crate::gcp::client::GcpClient;
use crate::gcp::operations::OperationStatus;
use crate::gcp::projects::{ApiInventory, GcloudInventory};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of accessible project ids
#[async_trait]
pub trait ProjectInventory: Send + Sync {
    async fn list_project_ids(&self) -> Result<Vec<String>>;

    /// Currently configured project, used when the inventory yields nothing
    async fn active_project(&self) -> Option<String>;
}

/// Cloud SQL instances
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    async fn list_instances(&self, project: &str) -> Result<Vec<DatabaseInstance>>;

    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance>;

    /// Replace the instance's authorized networks; returns the operation id
    async fn patch_authorized_networks(
        &self,
        project: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String>;

    async fn get_operation(&self, project: &str, operation: &str) -> Result<OperationStatus>;
}

/// GKE clusters
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// List clusters in all locations of a project
    async fn list_clusters(&self, project: &str) -> Result<Vec<Cluster>>;

    async fn get_cluster(&self, project: &str, location: &str, name: &str) -> Result<Cluster>;

    /// Enable and replace master authorized networks; returns the operation id
    async fn update_master_authorized_networks(
        &self,
        project: &str,
        location: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String>;

    async fn get_operation(
        &self,
        project: &str,
        location: &str,
        operation: &str,
    ) -> Result<OperationStatus>;
}

/// The three collaborators the engine needs
#[derive(Clone)]
pub struct Backends {
    pub inventory: Arc<dyn ProjectInventory>,
    pub databases: Arc<dyn DatabaseBackend>,
    pub clusters: Arc<dyn ClusterBackend>,
}

impl Backends {
    /// REST backends sharing one client
    pub fn gcp(client: GcpClient, config: &Config) -> Self {
        let fallback = config.effective_project();
        let inventory: Arc<dyn ProjectInventory> = match config.inventory {
            InventorySource::Api => Arc::new(ApiInventory::new(client.clone(), fallback)),
            InventorySource::Gcloud => Arc::new(GcloudInventory::new(fallback)),
        };
        let client = Arc::new(client);

        Self {
            inventory,
            databases: client.clone(),
            clusters: client,
        }
    }
}
