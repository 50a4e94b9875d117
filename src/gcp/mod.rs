//! GCP API interaction module
//!
//! Authentication, the REST client, and the two backends that carry
//! authorized networks.
//!
//! # Module Structure
//!
//! - [`auth`] - Application Default Credentials and active-project lookup
//! - [`client`] - Main GCP client and URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`projects`] - Project inventory and discovery
//! - [`sql`] - Cloud SQL Admin API
//! - [`container`] - GKE API
//! - [`operations`] - Long-running operation status
//!
//! # Example
//!
//! ```ignore
//! use tanc::gcp::client::GcpClient;
//! use tanc::resource::DatabaseBackend;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = GcpClient::new(Default::default()).await?;
//!     let instances = client.list_instances("my-project").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod container;
pub mod http;
pub mod operations;
pub mod projects;
pub mod sql;
