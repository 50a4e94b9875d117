//! Discover and extend authorized networks on Cloud SQL instances and GKE
//! clusters across every accessible GCP project.

pub mod app;
pub mod config;
pub mod error;
pub mod gcp;
pub mod resource;

/// Version injected at compile time via TANC_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TANC_VERSION") {
    Some(v) => v,
    None => "dev",
};
