//! Cloud SQL Admin API
//!
//! Wire types for the `sql/v1beta4` REST surface and the [`DatabaseBackend`]
//! implementation on [`GcpClient`].

use super::client::GcpClient;
use super::operations::OperationStatus;
use crate::resource::{normalize_cidr, AuthorizedNetwork, DatabaseBackend, DatabaseInstance};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ACL_ENTRY_KIND: &str = "sql#aclEntry";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlInstance {
    pub name: String,
    pub region: String,
    pub database_version: String,
    pub state: String,
    pub connection_name: String,
    pub ip_addresses: Vec<IpMapping>,
    pub settings: Option<Settings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpMapping {
    #[serde(rename = "type")]
    pub kind: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ip_configuration: Option<IpConfiguration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpConfiguration {
    pub ipv4_enabled: Option<bool>,
    pub authorized_networks: Vec<AclEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AclEntry {
    pub kind: String,
    pub name: String,
    pub value: String,
}

impl From<&AuthorizedNetwork> for AclEntry {
    fn from(network: &AuthorizedNetwork) -> Self {
        Self {
            kind: ACL_ENTRY_KIND.to_string(),
            name: network.display_name.clone(),
            value: network.cidr_value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct InstancesListResponse {
    items: Vec<SqlInstance>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlOperation {
    pub name: String,
    pub status: String,
    pub error: Option<SqlOperationErrors>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SqlOperationErrors {
    pub errors: Vec<SqlOperationError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SqlOperationError {
    pub code: String,
    pub message: String,
}

impl SqlOperation {
    pub fn status(&self) -> OperationStatus {
        let error = self
            .error
            .as_ref()
            .and_then(|e| e.errors.first())
            .map(|e| {
                if e.message.is_empty() {
                    e.code.clone()
                } else {
                    e.message.clone()
                }
            });
        OperationStatus::from_parts(&self.status, error)
    }
}

impl SqlInstance {
    /// Convert to the domain model.
    /// A PRIMARY address marks the instance public unless `ipv4Enabled` says otherwise.
    pub fn into_resource(self, project: &str) -> DatabaseInstance {
        let mut public_ip_enabled = false;
        let mut private_ip = None;

        for ip in &self.ip_addresses {
            match ip.kind.as_str() {
                "PRIMARY" => public_ip_enabled = true,
                "PRIVATE" => private_ip = Some(ip.ip_address.clone()),
                _ => {}
            }
        }

        let ip_configuration = self.settings.and_then(|s| s.ip_configuration);
        if let Some(enabled) = ip_configuration.as_ref().and_then(|c| c.ipv4_enabled) {
            public_ip_enabled = enabled;
        }

        let authorized_networks = ip_configuration
            .map(|c| c.authorized_networks)
            .unwrap_or_default()
            .into_iter()
            .map(|acl| AuthorizedNetwork {
                display_name: acl.name,
                cidr_value: normalize_cidr(&acl.value),
            })
            .collect();

        DatabaseInstance {
            name: self.name,
            project: project.to_string(),
            region: self.region,
            database_version: self.database_version,
            state: self.state,
            connection_name: self.connection_name,
            public_ip_enabled,
            private_ip,
            authorized_networks,
        }
    }
}

/// PATCH body replacing the instance's authorized networks
pub fn authorized_networks_patch(networks: &[AuthorizedNetwork]) -> serde_json::Value {
    let entries: Vec<AclEntry> = networks.iter().map(AclEntry::from).collect();
    json!({
        "settings": {
            "ipConfiguration": {
                "authorizedNetworks": entries
            }
        }
    })
}

#[async_trait]
impl DatabaseBackend for GcpClient {
    async fn list_instances(&self, project: &str) -> Result<Vec<DatabaseInstance>> {
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.sqladmin_url(project, "instances");
            if let Some(token) = &page_token {
                url = format!("{}?pageToken={}", url, urlencoding::encode(token));
            }

            let response = self
                .get(&url)
                .await
                .with_context(|| format!("Failed to list SQL instances in project {}", project))?;
            let page: InstancesListResponse =
                serde_json::from_value(response).context("Unexpected SQL instance list format")?;

            instances.extend(page.items.into_iter().map(|i| i.into_resource(project)));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(instances)
    }

    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance> {
        let response = self
            .get(&self.sql_instance_url(project, name))
            .await
            .context("Failed to get SQL instance details")?;
        let instance: SqlInstance =
            serde_json::from_value(response).context("Unexpected SQL instance format")?;
        Ok(instance.into_resource(project))
    }

    async fn patch_authorized_networks(
        &self,
        project: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String> {
        let body = authorized_networks_patch(networks);
        let response = self
            .patch(&self.sql_instance_url(project, name), &body)
            .await
            .context("Failed to update instance")?;
        let operation: SqlOperation =
            serde_json::from_value(response).context("Unexpected SQL operation format")?;

        if operation.name.is_empty() {
            anyhow::bail!("SQL Admin API returned an operation without a name");
        }
        Ok(operation.name)
    }

    async fn get_operation(&self, project: &str, operation: &str) -> Result<OperationStatus> {
        let response = self
            .get(&self.sql_operation_url(project, operation))
            .await
            .context("Failed to get operation status")?;
        let operation: SqlOperation =
            serde_json::from_value(response).context("Unexpected SQL operation format")?;
        Ok(operation.status())
    }
}
