//! Resource abstraction layer
//!
//! Discovery and mutation of authorized networks on Cloud SQL instances and
//! GKE clusters.
//!
//! # Architecture
//!
//! - [`model`] - The closed [`CloudResource`] sum type and CIDR normalization
//! - [`backend`] - Traits the engine uses to reach GCP, plus [`Backends`]
//! - [`catalog`] - Parallel multi-project listing into a sorted [`Snapshot`]
//! - [`detail`] - Fresh single-resource fetch
//! - [`mutation`] - Read-modify-append network add with operation polling
//!
//! # Example
//!
//! ```ignore
//! use tanc::resource::{list_all_resources, CatalogOptions};
//!
//! async fn scan(backends: &tanc::resource::Backends) -> anyhow::Result<()> {
//!     let snapshot = list_all_resources(backends, CatalogOptions::default()).await?;
//!     for resource in &snapshot.resources {
//!         println!("{} {}", resource.kind(), resource.display_name());
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod catalog;
pub mod detail;
pub mod model;
pub mod mutation;

pub use backend::{Backends, ClusterBackend, DatabaseBackend, ProjectInventory};
pub use catalog::{list_all_resources, CatalogOptions, Snapshot};
pub use detail::fetch_detail;
pub use model::{
    normalize_cidr, sort_resources, AuthorizedNetwork, CloudResource, Cluster, DatabaseInstance,
    ResourceKind,
};
pub use mutation::{add_network, AddNetworkOutcome, MutationOptions};
