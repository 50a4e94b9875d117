//! Resource Catalog
//!
//! Lists SQL instances and GKE clusters in every accessible project. Each
//! (project, kind) pair is its own task; a semaphore bounds how many are in
//! flight and results are funneled through one channel that is drained only
//! after every task has been joined.

use super::backend::Backends;
use super::model::{sort_resources, CloudResource, ResourceKind};
use crate::config::MAX_DISCOVERY_CONCURRENCY;
use crate::error::{AncError, AncResult, ListFailure};
use crate::gcp::http::format_gcp_error;
use crate::gcp::projects::discover_projects;
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;

/// Tuning for a discovery run
#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    /// Upper bound on concurrent list calls (clamped to 1..=20)
    pub max_concurrency: usize,
    /// Deadline for the whole run; unfinished tasks are recorded as failures
    pub deadline: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            max_concurrency: MAX_DISCOVERY_CONCURRENCY,
            deadline: Duration::from_secs(120),
        }
    }
}

/// Sorted resources plus every (project, kind) listing that failed
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub resources: Vec<CloudResource>,
    pub failures: Vec<ListFailure>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Resources, or `PartialListFailure` if any listing failed
    pub fn into_strict(self) -> AncResult<Vec<CloudResource>> {
        if self.failures.is_empty() {
            Ok(self.resources)
        } else {
            Err(AncError::PartialListFailure(self.failures))
        }
    }

    /// Resources matching a list filter
    pub fn filtered<'a>(&'a self, query: &'a str) -> impl Iterator<Item = &'a CloudResource> + 'a {
        self.resources.iter().filter(move |r| r.matches_filter(query))
    }
}

struct TaskResult {
    project: String,
    kind: ResourceKind,
    outcome: Result<Vec<CloudResource>, String>,
}

async fn fetch_kind(
    backends: &Backends,
    project: &str,
    kind: ResourceKind,
) -> Result<Vec<CloudResource>> {
    let resources = match kind {
        ResourceKind::DatabaseInstance => backends
            .databases
            .list_instances(project)
            .await?
            .into_iter()
            .map(CloudResource::DatabaseInstance)
            .collect(),
        ResourceKind::Cluster => backends
            .clusters
            .list_clusters(project)
            .await?
            .into_iter()
            .map(CloudResource::Cluster)
            .collect(),
    };
    Ok(resources)
}

/// Discover every SQL instance and GKE cluster in every accessible project.
///
/// Only project resolution can fail the whole call; per-project listing
/// errors end up in [`Snapshot::failures`].
pub async fn list_all_resources(
    backends: &Backends,
    options: CatalogOptions,
) -> AncResult<Snapshot> {
    let projects = discover_projects(backends.inventory.as_ref()).await?;

    let tasks: Vec<(String, ResourceKind)> = projects
        .iter()
        .flat_map(|p| {
            [
                (p.clone(), ResourceKind::DatabaseInstance),
                (p.clone(), ResourceKind::Cluster),
            ]
        })
        .collect();

    let width = options
        .max_concurrency
        .clamp(1, MAX_DISCOVERY_CONCURRENCY)
        .min(tasks.len());
    let semaphore = Arc::new(Semaphore::new(width));
    let deadline = Instant::now() + options.deadline;
    let (tx, mut rx) = mpsc::unbounded_channel::<TaskResult>();

    tracing::info!(
        "Listing resources in {} projects ({} tasks, {} concurrent)",
        projects.len(),
        tasks.len(),
        width
    );

    let handles: Vec<_> = tasks
        .iter()
        .cloned()
        .map(|(project, kind)| {
            let semaphore = semaphore.clone();
            let backends = backends.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let run = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .context("Discovery semaphore closed")?;
                    fetch_kind(&backends, &project, kind).await
                };

                let outcome = match tokio::time::timeout_at(deadline, run).await {
                    Ok(Ok(resources)) => Ok(resources),
                    Ok(Err(e)) => {
                        tracing::warn!("Failed to list {} in {}: {:#}", kind, project, e);
                        Err(format_gcp_error(&e))
                    }
                    Err(_) => {
                        tracing::warn!("Listing {} in {} timed out", kind, project);
                        Err("timed out".to_string())
                    }
                };

                // The receiver outlives every task
                let _ = tx.send(TaskResult {
                    project,
                    kind,
                    outcome,
                });
            })
        })
        .collect();
    drop(tx);

    let joined = join_all(handles).await;

    let mut snapshot = Snapshot::default();

    for ((project, kind), result) in tasks.into_iter().zip(joined) {
        if let Err(e) = result {
            tracing::error!("Listing task for {} {} aborted: {}", kind, project, e);
            snapshot.failures.push(ListFailure {
                project,
                kind,
                message: "listing task aborted".to_string(),
            });
        }
    }

    while let Some(result) = rx.recv().await {
        match result.outcome {
            Ok(resources) => snapshot.resources.extend(resources),
            Err(message) => snapshot.failures.push(ListFailure {
                project: result.project,
                kind: result.kind,
                message,
            }),
        }
    }

    sort_resources(&mut snapshot.resources);
    snapshot
        .failures
        .sort_by(|a, b| (&a.project, a.kind.tag()).cmp(&(&b.project, b.kind.tag())));

    tracing::info!(
        "Discovered {} resources, {} failed listings",
        snapshot.resources.len(),
        snapshot.failures.len()
    );

    Ok(snapshot)
}
