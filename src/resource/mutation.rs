//! Network Mutation Engine
//!
//! Adds one authorized network to a SQL instance or GKE cluster:
//! read the current list from the backend, refuse duplicates, append,
//! submit, then poll the long-running operation until it settles.

use super::backend::Backends;
use super::detail::fetch_detail;
use super::model::{normalize_cidr, AuthorizedNetwork, CloudResource};
use crate::error::{AncError, AncResult};
use crate::gcp::http::format_gcp_error;
use crate::gcp::operations::OperationStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Polling cadence for long-running operations
#[derive(Debug, Clone, Copy)]
pub struct MutationOptions {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
        }
    }
}

/// Result of a completed add
#[derive(Debug, Clone, Serialize)]
pub struct AddNetworkOutcome {
    pub message: String,
    pub network: AuthorizedNetwork,
    pub operation: String,
    pub completed_at: DateTime<Utc>,
}

/// Where a submitted operation lives
enum OperationRef<'a> {
    Sql {
        project: &'a str,
        operation: String,
    },
    Gke {
        project: &'a str,
        location: &'a str,
        operation: String,
    },
}

impl OperationRef<'_> {
    fn id(&self) -> &str {
        match self {
            Self::Sql { operation, .. } | Self::Gke { operation, .. } => operation.as_str(),
        }
    }
}

/// Add `display_name` / `raw_value` to the resource's authorized networks.
///
/// `resource` is only used to locate the backend object; the network list
/// that gets extended is always re-read first. On any error the backend may
/// or may not have applied the change (see `Timeout` and `PollFailed`), so callers should
/// re-fetch detail rather than patch their local copy.
pub async fn add_network(
    backends: &Backends,
    options: MutationOptions,
    resource: &CloudResource,
    display_name: &str,
    raw_value: &str,
) -> AncResult<AddNetworkOutcome> {
    let span = tracing::info_span!(
        "add_network",
        mutation_id = %Uuid::new_v4(),
        resource = %resource.display_name(),
        kind = %resource.kind(),
    );

    add_network_inner(backends, options, resource, display_name, raw_value)
        .instrument(span)
        .await
}

fn check_capability(resource: &CloudResource) -> AncResult<()> {
    if resource.can_add_network() {
        return Ok(());
    }
    let reason = resource
        .network_restrictions()
        .unwrap_or("This resource cannot accept external networks");
    Err(AncError::CannotMutate(reason.to_string()))
}

async fn add_network_inner(
    backends: &Backends,
    options: MutationOptions,
    resource: &CloudResource,
    display_name: &str,
    raw_value: &str,
) -> AncResult<AddNetworkOutcome> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(AncError::InvalidInput("Network name is required".to_string()));
    }
    if raw_value.trim().is_empty() {
        return Err(AncError::InvalidInput("IP address is required".to_string()));
    }

    check_capability(resource)?;

    let cidr = normalize_cidr(raw_value);

    let current = fetch_detail(backends, resource).await?;
    check_capability(&current)?;

    if let Some(existing) = current.find_network(&cidr) {
        tracing::info!("{} already authorized as {}", cidr, existing.display_name);
        return Err(AncError::DuplicateNetwork {
            cidr,
            proposed_name: display_name.to_string(),
            existing_name: existing.display_name.clone(),
        });
    }

    let network = AuthorizedNetwork {
        display_name: display_name.to_string(),
        cidr_value: cidr,
    };
    let mut networks = current.authorized_networks().to_vec();
    networks.push(network.clone());

    tracing::info!(
        "Submitting {} ({}) to {}, {} networks total",
        network.display_name,
        network.cidr_value,
        current.display_name(),
        networks.len()
    );

    let submitted = match &current {
        CloudResource::DatabaseInstance(db) => backends
            .databases
            .patch_authorized_networks(&db.project, &db.name, &networks)
            .await
            .map(|operation| OperationRef::Sql {
                project: &db.project,
                operation,
            }),
        CloudResource::Cluster(c) => backends
            .clusters
            .update_master_authorized_networks(&c.project, &c.location, &c.name, &networks)
            .await
            .map(|operation| OperationRef::Gke {
                project: &c.project,
                location: &c.location,
                operation,
            }),
    };

    let operation = submitted.map_err(|e| {
        tracing::error!("Update rejected: {:#}", e);
        AncError::BackendRejected(format_gcp_error(&e))
    })?;

    wait_for_operation(backends, options, &operation).await?;

    tracing::info!("Network {} added", network.display_name);

    Ok(AddNetworkOutcome {
        message: format!("Successfully added network {}", network.display_name),
        network,
        operation: operation.id().to_string(),
        completed_at: Utc::now(),
    })
}

async fn poll_once(
    backends: &Backends,
    operation: &OperationRef<'_>,
) -> anyhow::Result<OperationStatus> {
    match operation {
        OperationRef::Sql { project, operation } => {
            backends.databases.get_operation(project, operation).await
        }
        OperationRef::Gke {
            project,
            location,
            operation,
        } => {
            backends
                .clusters
                .get_operation(project, location, operation)
                .await
        }
    }
}

/// Poll at a fixed interval until the operation is DONE or the deadline passes.
/// The first poll happens one interval after submission; a failed poll request
/// ends the wait.
async fn wait_for_operation(
    backends: &Backends,
    options: MutationOptions,
    operation: &OperationRef<'_>,
) -> AncResult<()> {
    let poll = async {
        let start = tokio::time::Instant::now() + options.poll_interval;
        let mut ticker = tokio::time::interval_at(start, options.poll_interval);

        loop {
            ticker.tick().await;

            match poll_once(backends, operation).await {
                Ok(OperationStatus::Done) => return Ok(()),
                Ok(OperationStatus::Failed(message)) => {
                    return Err(AncError::OperationFailed(message));
                }
                Ok(OperationStatus::Running) => {
                    tracing::debug!("Operation {} still running", operation.id());
                }
                Ok(OperationStatus::Unknown(status)) => {
                    tracing::warn!("Unknown operation status: {}", status);
                }
                Err(e) => {
                    tracing::error!("Failed to poll operation {}: {:#}", operation.id(), e);
                    return Err(AncError::PollFailed {
                        operation: operation.id().to_string(),
                        message: format_gcp_error(&e),
                    });
                }
            }
        }
    };

    match tokio::time::timeout(options.deadline, poll).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                "Operation {} not done after {}s",
                operation.id(),
                options.deadline.as_secs()
            );
            Err(AncError::Timeout {
                operation: operation.id().to_string(),
                waited: options.deadline,
            })
        }
    }
}
