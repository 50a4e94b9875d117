//! Long-running operation status shared by the SQL Admin and GKE APIs

/// Status of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// PENDING / RUNNING / ABORTING
    Running,
    /// DONE without error
    Done,
    /// DONE with the first reported error message
    Failed(String),
    Unknown(String),
}

impl OperationStatus {
    /// Build a status from the API's status string and optional error message
    pub fn from_parts(status: &str, error: Option<String>) -> Self {
        match status {
            "DONE" => match error {
                Some(msg) => Self::Failed(msg),
                None => Self::Done,
            },
            "PENDING" | "RUNNING" | "ABORTING" => Self::Running,
            other => Self::Unknown(other.to_string()),
        }
    }
}
