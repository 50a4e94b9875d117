//! In-memory backends for exercising the engine without GCP

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tanc::gcp::http::ApiError;
use tanc::gcp::operations::OperationStatus;
use tanc::resource::{
    AuthorizedNetwork, Backends, Cluster, ClusterBackend, DatabaseBackend, DatabaseInstance,
    ProjectInventory,
};

/// Tracks how many list calls run at once
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub struct FakeInventory {
    pub ids: Result<Vec<String>, String>,
    pub active: Option<String>,
}

#[async_trait]
impl ProjectInventory for FakeInventory {
    async fn list_project_ids(&self) -> Result<Vec<String>> {
        self.ids.clone().map_err(|e| anyhow::anyhow!(e))
    }

    async fn active_project(&self) -> Option<String> {
        self.active.clone()
    }
}

/// One fake backend serving both SQL instances and GKE clusters
#[derive(Default)]
pub struct FakeCloud {
    pub instances: Mutex<HashMap<(String, String), DatabaseInstance>>,
    pub clusters: Mutex<HashMap<(String, String), Cluster>>,
    /// Projects whose SQL listing fails
    pub failing_sql: HashSet<String>,
    /// Projects whose GKE listing fails
    pub failing_gke: HashSet<String>,
    /// Projects whose listings never return
    pub hanging: HashSet<String>,
    pub list_delay: Duration,
    pub gauge: Gauge,
    /// Every backend call, list calls included
    pub calls: AtomicUsize,
    /// Statuses handed out by successive operation polls; `Running` once empty
    pub op_script: Mutex<VecDeque<OperationStatus>>,
    /// Status code returned by patch/update
    pub reject_with: Option<u16>,
    /// Status code returned by every operation poll
    pub poll_error: Option<u16>,
    pending: Mutex<HashMap<String, Pending>>,
    op_counter: AtomicUsize,
}

enum Pending {
    Sql((String, String), Vec<AuthorizedNetwork>),
    Gke((String, String), Vec<AuthorizedNetwork>),
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, db: DatabaseInstance) -> Self {
        self.instances
            .lock()
            .unwrap()
            .insert((db.project.clone(), db.name.clone()), db);
        self
    }

    pub fn with_cluster(self, cluster: Cluster) -> Self {
        self.clusters
            .lock()
            .unwrap()
            .insert((cluster.project.clone(), cluster.name.clone()), cluster);
        self
    }

    pub fn script(self, statuses: Vec<OperationStatus>) -> Self {
        *self.op_script.lock().unwrap() = statuses.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn instance(&self, project: &str, name: &str) -> Option<DatabaseInstance> {
        self.instances
            .lock()
            .unwrap()
            .get(&(project.to_string(), name.to_string()))
            .cloned()
    }

    async fn list_guard(&self, project: &str, failing: &HashSet<String>) -> Result<()> {
        self.gauge.enter();
        if self.hanging.contains(project) {
            tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
        }
        tokio::time::sleep(self.list_delay).await;
        self.gauge.exit();
        if failing.contains(project) {
            return Err(ApiError::new(403, Some("permission denied".to_string())).into());
        }
        Ok(())
    }

    fn next_op(&self, pending: Pending) -> Result<String> {
        if let Some(status) = self.reject_with {
            return Err(ApiError::new(status, Some("rejected".to_string())).into());
        }
        let id = format!("op-{}", self.op_counter.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().unwrap().insert(id.clone(), pending);
        Ok(id)
    }

    fn poll(&self, operation: &str) -> Result<OperationStatus> {
        if let Some(status) = self.poll_error {
            return Err(ApiError::new(status, Some("operation lookup failed".to_string())).into());
        }
        let status = self
            .op_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(OperationStatus::Running);

        if status == OperationStatus::Done {
            match self.pending.lock().unwrap().remove(operation) {
                Some(Pending::Sql(key, networks)) => {
                    if let Some(db) = self.instances.lock().unwrap().get_mut(&key) {
                        db.authorized_networks = networks;
                    }
                }
                Some(Pending::Gke(key, networks)) => {
                    if let Some(c) = self.clusters.lock().unwrap().get_mut(&key) {
                        c.master_authorized_networks_enabled = true;
                        c.master_authorized_networks = networks;
                    }
                }
                None => {}
            }
        }
        Ok(status)
    }
}

fn not_found() -> anyhow::Error {
    anyhow::Error::new(ApiError::new(404, None)).context("Failed to get details")
}

#[async_trait]
impl DatabaseBackend for FakeCloud {
    async fn list_instances(&self, project: &str) -> Result<Vec<DatabaseInstance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.list_guard(project, &self.failing_sql).await?;
        Ok(self
            .instances
            .lock()
            .unwrap()
            .values()
            .filter(|db| db.project == project)
            .cloned()
            .collect())
    }

    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instance(project, name).ok_or_else(not_found)
    }

    async fn patch_authorized_networks(
        &self,
        project: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_op(Pending::Sql(
            (project.to_string(), name.to_string()),
            networks.to_vec(),
        ))
    }

    async fn get_operation(&self, _project: &str, operation: &str) -> Result<OperationStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.poll(operation)
    }
}

#[async_trait]
impl ClusterBackend for FakeCloud {
    async fn list_clusters(&self, project: &str) -> Result<Vec<Cluster>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.list_guard(project, &self.failing_gke).await?;
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.project == project)
            .cloned()
            .collect())
    }

    async fn get_cluster(&self, project: &str, _location: &str, name: &str) -> Result<Cluster> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.clusters
            .lock()
            .unwrap()
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_master_authorized_networks(
        &self,
        project: &str,
        _location: &str,
        name: &str,
        networks: &[AuthorizedNetwork],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_op(Pending::Gke(
            (project.to_string(), name.to_string()),
            networks.to_vec(),
        ))
    }

    async fn get_operation(
        &self,
        _project: &str,
        _location: &str,
        operation: &str,
    ) -> Result<OperationStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.poll(operation)
    }
}

pub fn backends(cloud: Arc<FakeCloud>, projects: &[&str]) -> Backends {
    Backends {
        inventory: Arc::new(FakeInventory {
            ids: Ok(projects.iter().map(|p| p.to_string()).collect()),
            active: None,
        }),
        databases: cloud.clone(),
        clusters: cloud,
    }
}

pub fn sql_instance(project: &str, name: &str, public: bool) -> DatabaseInstance {
    DatabaseInstance {
        name: name.to_string(),
        project: project.to_string(),
        region: "europe-west1".to_string(),
        database_version: "POSTGRES_15".to_string(),
        state: "RUNNABLE".to_string(),
        connection_name: format!("{}:europe-west1:{}", project, name),
        public_ip_enabled: public,
        private_ip: None,
        authorized_networks: Vec::new(),
    }
}

pub fn gke_cluster(project: &str, name: &str) -> Cluster {
    Cluster {
        name: name.to_string(),
        project: project.to_string(),
        location: "europe-west1".to_string(),
        status: "RUNNING".to_string(),
        endpoint: "34.1.1.1".to_string(),
        private_cluster_enabled: false,
        private_endpoint: String::new(),
        public_endpoint: "34.1.1.1".to_string(),
        master_authorized_networks_enabled: true,
        master_authorized_networks: Vec::new(),
    }
}
