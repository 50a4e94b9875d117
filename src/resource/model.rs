//! Resource Model
//!
//! A closed set of resources that carry authorized networks: Cloud SQL
//! instances and GKE clusters. Everything outside the catalog, detail and
//! mutation code talks to them through [`CloudResource`] only.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Kind of resource, tagged the way it is shown to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    #[serde(rename = "GKE")]
    Cluster,
    #[serde(rename = "SQL")]
    DatabaseInstance,
}

impl ResourceKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cluster => "GKE",
            Self::DatabaseInstance => "SQL",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// An allow-listed network range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedNetwork {
    pub display_name: String,
    pub cidr_value: String,
}

impl AuthorizedNetwork {
    /// Build an entry, normalizing the value to CIDR notation
    pub fn new(display_name: &str, value: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            cidr_value: normalize_cidr(value),
        }
    }
}

/// Ensure a value carries a CIDR suffix; bare addresses become /32.
/// Syntax is left for the backend to validate.
pub fn normalize_cidr(value: &str) -> String {
    let value = value.trim();
    if value.contains('/') {
        value.to_string()
    } else {
        format!("{}/32", value)
    }
}

/// Cloud SQL instance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseInstance {
    pub name: String,
    pub project: String,
    pub region: String,
    pub database_version: String,
    pub state: String,
    pub connection_name: String,
    pub public_ip_enabled: bool,
    pub private_ip: Option<String>,
    pub authorized_networks: Vec<AuthorizedNetwork>,
}

/// GKE cluster control plane
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cluster {
    pub name: String,
    pub project: String,
    /// Zone or region
    pub location: String,
    pub status: String,
    pub endpoint: String,
    pub private_cluster_enabled: bool,
    pub private_endpoint: String,
    pub public_endpoint: String,
    pub master_authorized_networks_enabled: bool,
    pub master_authorized_networks: Vec<AuthorizedNetwork>,
}

const SQL_PRIVATE_ONLY: &str = "Private IP only - cannot add external networks";
const GKE_PRIVATE_ONLY: &str = "Private cluster - access via private endpoint only";

/// A resource whose authorized networks can be listed and extended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CloudResource {
    #[serde(rename = "SQL")]
    DatabaseInstance(DatabaseInstance),
    #[serde(rename = "GKE")]
    Cluster(Cluster),
}

impl CloudResource {
    pub fn name(&self) -> &str {
        match self {
            Self::DatabaseInstance(db) => &db.name,
            Self::Cluster(c) => &c.name,
        }
    }

    pub fn project(&self) -> &str {
        match self {
            Self::DatabaseInstance(db) => &db.project,
            Self::Cluster(c) => &c.project,
        }
    }

    /// Region for SQL instances, zone or region for clusters
    pub fn location(&self) -> &str {
        match self {
            Self::DatabaseInstance(db) => &db.region,
            Self::Cluster(c) => &c.location,
        }
    }

    /// Key-only reference to a resource, enough to fetch its detail
    pub fn reference(kind: ResourceKind, project: &str, name: &str, location: &str) -> Self {
        match kind {
            ResourceKind::DatabaseInstance => Self::DatabaseInstance(DatabaseInstance {
                name: name.to_string(),
                project: project.to_string(),
                region: location.to_string(),
                ..Default::default()
            }),
            ResourceKind::Cluster => Self::Cluster(Cluster {
                name: name.to_string(),
                project: project.to_string(),
                location: location.to_string(),
                ..Default::default()
            }),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::DatabaseInstance(_) => ResourceKind::DatabaseInstance,
            Self::Cluster(_) => ResourceKind::Cluster,
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name(), self.project())
    }

    pub fn has_public_ip(&self) -> bool {
        match self {
            Self::DatabaseInstance(db) => db.public_ip_enabled,
            Self::Cluster(c) => !c.public_endpoint.is_empty(),
        }
    }

    /// Whether external networks may be authorized on this resource.
    /// Clusters always accept master authorized networks.
    pub fn can_add_network(&self) -> bool {
        match self {
            Self::DatabaseInstance(db) => db.public_ip_enabled,
            Self::Cluster(_) => true,
        }
    }

    /// Human readable explanation of why access is restricted, if it is
    pub fn network_restrictions(&self) -> Option<&'static str> {
        match self {
            Self::DatabaseInstance(db) if !db.public_ip_enabled => Some(SQL_PRIVATE_ONLY),
            Self::Cluster(c) if c.private_cluster_enabled && c.public_endpoint.is_empty() => {
                Some(GKE_PRIVATE_ONLY)
            }
            _ => None,
        }
    }

    pub fn authorized_networks(&self) -> &[AuthorizedNetwork] {
        match self {
            Self::DatabaseInstance(db) => &db.authorized_networks,
            Self::Cluster(c) => &c.master_authorized_networks,
        }
    }

    /// Entry already holding the given (normalized) CIDR, if any
    pub fn find_network(&self, cidr: &str) -> Option<&AuthorizedNetwork> {
        self.authorized_networks()
            .iter()
            .find(|n| n.cidr_value == cidr)
    }

    /// Cloud Console page for this resource
    pub fn console_url(&self) -> String {
        match self {
            Self::DatabaseInstance(db) => format!(
                "https://console.cloud.google.com/sql/instances/{}/edit?project={}",
                db.name, db.project
            ),
            Self::Cluster(c) => format!(
                "https://console.cloud.google.com/kubernetes/clusters/details/{}/{}?project={}",
                c.location, c.name, c.project
            ),
        }
    }

    /// Text searched by list filters: name and project first, location and type last
    pub fn filter_value(&self) -> String {
        format!(
            "{} {} {}_{}",
            self.name(),
            self.project(),
            self.location(),
            self.kind()
        )
    }

    /// Case-insensitive substring match; an empty query matches everything
    pub fn matches_filter(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        self.filter_value()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    /// Ordering used for snapshots: type tag, then project, then name
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        (self.kind().tag(), self.project(), self.name()).cmp(&(
            other.kind().tag(),
            other.project(),
            other.name(),
        ))
    }
}

/// Sort resources by type, project, then name
pub fn sort_resources(resources: &mut [CloudResource]) {
    resources.sort_by(|a, b| a.sort_cmp(b));
}
