//! Detail fetch
//!
//! Re-reads a single resource from its backend so callers never act on a
//! stale copy.

use super::backend::Backends;
use super::model::CloudResource;
use crate::error::{AncError, AncResult};
use crate::gcp::http::{format_gcp_error, is_not_found};

/// Fetch a fresh copy of `resource`, keyed by (project, name) for SQL
/// instances and (project, location, name) for clusters.
pub async fn fetch_detail(
    backends: &Backends,
    resource: &CloudResource,
) -> AncResult<CloudResource> {
    tracing::debug!(
        "Fetching detail for {} {}",
        resource.kind(),
        resource.display_name()
    );

    let result = match resource {
        CloudResource::DatabaseInstance(db) => backends
            .databases
            .get_instance(&db.project, &db.name)
            .await
            .map(CloudResource::DatabaseInstance),
        CloudResource::Cluster(c) => backends
            .clusters
            .get_cluster(&c.project, &c.location, &c.name)
            .await
            .map(CloudResource::Cluster),
    };

    result.map_err(|e| {
        if is_not_found(&e) {
            AncError::NotFound {
                kind: resource.kind(),
                project: resource.project().to_string(),
                name: resource.name().to_string(),
            }
        } else {
            tracing::warn!("Detail fetch failed for {}: {:#}", resource.display_name(), e);
            AncError::Backend(format_gcp_error(&e))
        }
    })
}
