//! Error types for discovery and network mutation.

use crate::resource::ResourceKind;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single project/kind listing that failed during discovery
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ListFailure {
    pub project: String,
    pub kind: ResourceKind,
    pub message: String,
}

impl fmt::Display for ListFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.project, self.message)
    }
}

#[derive(Debug, Error)]
pub enum AncError {
    #[error("No projects found. Run 'gcloud config set project PROJECT_ID' or pass --project")]
    NoProjectsResolvable,

    #[error("Failed to list {} project/type combination(s): {}", .0.len(), join_failures(.0))]
    PartialListFailure(Vec<ListFailure>),

    #[error("{kind} resource {name} not found in project {project}")]
    NotFound {
        kind: ResourceKind,
        project: String,
        name: String,
    },

    #[error("{0}")]
    CannotMutate(String),

    #[error("{}", duplicate_message(.cidr, .proposed_name, .existing_name))]
    DuplicateNetwork {
        cidr: String,
        proposed_name: String,
        existing_name: String,
    },

    #[error("Failed to submit update: {0}")]
    BackendRejected(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Failed to check operation {operation}: {message}")]
    PollFailed { operation: String, message: String },

    #[error("Operation {operation} did not complete within {}s", .waited.as_secs())]
    Timeout { operation: String, waited: Duration },

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Backend(String),
}

pub type AncResult<T> = Result<T, AncError>;

fn duplicate_message(cidr: &str, proposed_name: &str, existing_name: &str) -> String {
    if proposed_name == existing_name {
        format!("network {} with name {} already exists", cidr, proposed_name)
    } else {
        format!("network {} already exists with name {}", cidr, existing_name)
    }
}

fn join_failures(failures: &[ListFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
