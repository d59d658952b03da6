//! Per-resource-kind event dispatcher over the union of tenant clusters
//! (spec.md §4.3).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use log::warn;

use crate::client::TenantClient;
use crate::error::SyncError;
use crate::multicluster::queue::{EventKind, ReconcileRequest, WorkQueue};
use crate::multicluster::spec::VirtualClusterSpec;

/// Default per-kind worker pool sizes (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub enum WorkerPoolSize {
    Low,
    Medium,
    High,
}

impl WorkerPoolSize {
    pub fn worker_count(self) -> usize {
        match self {
            WorkerPoolSize::Low => 3,
            WorkerPoolSize::Medium => 5,
            WorkerPoolSize::High => 10,
        }
    }
}

pub struct MultiClusterController<T> {
    clients: RwLock<HashMap<String, Arc<dyn TenantClient<T>>>>,
    queue: Arc<WorkQueue>,
    worker_count: usize,
}

impl<T: Clone + Send + Sync + 'static> MultiClusterController<T> {
    pub fn new(worker_count: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            queue: Arc::new(WorkQueue::default()),
            worker_count,
        }
    }

    /// Installs `client` as the connection for `cluster` and starts
    /// accepting reconcile requests for it (spec.md §4.3).
    pub fn watch_cluster_resource(&self, cluster: &str, client: Arc<dyn TenantClient<T>>) {
        self.clients.write().unwrap().insert(cluster.to_string(), client);
    }

    /// Removes the connection for `cluster` and drops its pending requests
    /// (spec.md §4.3, §5: "deterministically stops every watcher, drains
    /// its queue").
    pub fn teardown_cluster_resource(&self, cluster: &str) {
        self.clients.write().unwrap().remove(cluster);
        self.queue.drop_cluster(cluster);
    }

    pub fn get(&self, cluster: &str, namespace: &str, name: &str) -> Result<T, SyncError> {
        let clients = self.clients.read().unwrap();
        let client = clients.get(cluster).ok_or(SyncError::NotFound)?;
        client.get(namespace, name)?.ok_or(SyncError::NotFound)
    }

    pub fn list(&self, cluster: &str) -> Result<Vec<T>, SyncError> {
        let clients = self.clients.read().unwrap();
        let client = clients.get(cluster).ok_or(SyncError::NotFound)?;
        client.list()
    }

    pub fn list_by_object_type(&self, cluster: &str, object_type: &str) -> Result<Vec<T>, SyncError> {
        let clients = self.clients.read().unwrap();
        let client = clients.get(cluster).ok_or(SyncError::NotFound)?;
        client.list_by_object_type(object_type)
    }

    pub fn get_spec(&self, cluster: &str) -> Result<VirtualClusterSpec, SyncError> {
        let clients = self.clients.read().unwrap();
        let client = clients.get(cluster).ok_or(SyncError::NotFound)?;
        Ok(client.spec())
    }

    pub fn clusters(&self) -> Vec<String> {
        self.clients.read().unwrap().keys().cloned().collect()
    }

    /// Writes a tenant-side mirror back through its cluster's client, the
    /// upward half of spec.md §4.4's `StartUWS`.
    pub fn update_status(&self, cluster: &str, namespace: &str, name: &str, obj: T) -> Result<(), SyncError> {
        let clients = self.clients.read().unwrap();
        let client = clients.get(cluster).ok_or(SyncError::NotFound)?;
        client.update_status(namespace, name, obj)
    }

    /// Injects a synthetic reconcile request (spec.md §4.3, `RequeueObject`).
    pub fn requeue_object(&self, cluster: &str, namespace: &str, name: &str) {
        self.queue.add(ReconcileRequest {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            event: EventKind::Update,
        });
    }

    /// Called by the (externally owned) tenant informer plumbing whenever a
    /// tenant-side add/update/delete fires; turns it into a reconcile
    /// request (spec.md §4.3).
    pub fn on_tenant_event(&self, cluster: &str, namespace: &str, name: &str, event: EventKind) {
        self.queue.add(ReconcileRequest {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            event,
        });
    }

    /// Spawns `worker_count` threads draining the queue and invoking
    /// `handler` for each ready request; keys are processed serially, and
    /// distinct keys run in parallel bounded by `worker_count` (spec.md
    /// §4.3). Failed reconciles (`handler` returning `Err`) are
    /// re-enqueued with exponential backoff.
    pub fn run<F>(self: &Arc<Self>, handler: F, stop: Arc<AtomicBool>) -> Vec<JoinHandle<()>>
    where
        F: Fn(&ReconcileRequest) -> Result<(), SyncError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        (0..self.worker_count)
            .map(|_| {
                let queue = self.queue.clone();
                let handler = handler.clone();
                let stop = stop.clone();
                std::thread::spawn(move || loop {
                    if stop.load(Ordering::Relaxed) {
                        queue.stop();
                        break;
                    }
                    let Some((request, attempts)) = queue.get() else {
                        break;
                    };
                    match handler(&request) {
                        Ok(()) => {}
                        Err(err) => {
                            warn!("reconcile {} failed, requeuing: {}", request.key(), err);
                            queue.add_rate_limited(request.clone(), attempts + 1);
                        }
                    }
                    queue.done(&request);
                })
            })
            .collect()
    }

    pub fn stop(&self) {
        self.queue.stop();
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<T> std::fmt::Debug for MultiClusterController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiClusterController")
            .field("clusters", &self.clients.read().unwrap().len())
            .field("worker_count", &self.worker_count)
            .finish()
    }
}

