//! Per-resource-kind downward/upward reconciliation and patrol (spec.md
//! §4.4). [`ResourceSyncer`] is the small per-kind interface spec.md §9
//! calls for ("a single `ResourceSyncer` interface... plus kind-specific
//! equality and mutation pure functions"); [`SyncerEngine`] drives it
//! through the three entry points against a [`MultiClusterController`] of
//! tenant clusters and a single super-cluster [`SuperClient`].

pub mod equality;
pub mod metadata;
pub mod mutation;
pub mod namespace_sync;
pub mod object;
pub mod pod_sync;
pub mod vnode;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use log::{info, warn};

use crate::client::SuperClient;
use crate::error::SyncError;
use crate::multicluster::controller::MultiClusterController;
use crate::multicluster::queue::ReconcileRequest;
use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::object::SyncedObject;

/// Per-kind pluggable logic (spec.md §4.4, §9). Implementations are
/// typically zero-sized and stateless — the engine carries all mutable
/// state — matching the teacher's free-function plugin style for logic that
/// needs no per-kind state of its own.
pub trait ResourceSyncer: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Builds the super-side object to create when a tenant object has no
    /// super counterpart yet (Reconcile case 1, spec.md §4.4).
    fn build_super_object(&self, tenant: &SyncedObject, cluster: &str, spec: &VirtualClusterSpec) -> SyncedObject;

    /// `CheckEquality` (Reconcile case 3); defaults to the shared
    /// metadata/body rules every kind needs (spec.md §4.4).
    fn check_equality(
        &self,
        super_obj: &SyncedObject,
        tenant_obj: &SyncedObject,
        spec: &VirtualClusterSpec,
    ) -> Option<SyncedObject> {
        equality::check_equality(super_obj, tenant_obj, spec)
    }

    /// `StartUWS`'s per-object rule: given the current super object and its
    /// tenant mirror, returns the tenant patch to write back, or `None` if
    /// nothing propagates upward for this kind (spec.md §4.4).
    fn apply_uws(
        &self,
        tenant_obj: &SyncedObject,
        super_obj: &SyncedObject,
        spec: &VirtualClusterSpec,
    ) -> Option<SyncedObject>;
}

/// Counters for the orphan-deletion and drift-requeue outcomes of
/// `StartPatrol` (spec.md §8, scenario S7). Registering these against a
/// real metrics backend is out of scope (spec.md §1); this is the ambient
/// "count what you did" bookkeeping every patroller in the corpus keeps,
/// exposed here as plain atomics rather than a registered metric.
#[derive(Default)]
pub struct PatrolMetrics {
    pub deleted_orphan_super: AtomicU64,
    pub requeued_missing_super: AtomicU64,
    pub requeued_drift: AtomicU64,
}

/// Drives one [`ResourceSyncer`] through `Reconcile`, `StartUWS` and
/// `StartPatrol` against the union of tenant clusters and the super
/// cluster (spec.md §4.4).
pub struct SyncerEngine {
    syncer: Arc<dyn ResourceSyncer>,
    mcc: Arc<MultiClusterController<SyncedObject>>,
    super_client: Arc<dyn SuperClient<SyncedObject>>,
    metrics: PatrolMetrics,
}

impl SyncerEngine {
    pub fn new(
        syncer: Arc<dyn ResourceSyncer>,
        mcc: Arc<MultiClusterController<SyncedObject>>,
        super_client: Arc<dyn SuperClient<SyncedObject>>,
    ) -> Self {
        Self {
            syncer,
            mcc,
            super_client,
            metrics: PatrolMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &PatrolMetrics {
        &self.metrics
    }

    /// The downward reconciler (spec.md §4.4): reads the tenant and super
    /// views of `(cluster, namespace, name)` and reconciles the four cases.
    /// `NotFound`/`AlreadyExists` in the directions spec.md §7 calls out
    /// are coerced to success.
    pub fn reconcile(&self, req: &ReconcileRequest) -> Result<(), SyncError> {
        let super_namespace = metadata::super_namespace(&req.cluster, &req.namespace);
        let tenant_result = self.mcc.get(&req.cluster, &req.namespace, &req.name);
        let super_obj = self.super_client.get(&super_namespace, &req.name)?;

        match (tenant_result, super_obj) {
            (Ok(tenant_obj), None) => {
                let spec = self.mcc.get_spec(&req.cluster)?;
                let built = self.syncer.build_super_object(&tenant_obj, &req.cluster, &spec);
                match self.super_client.create(built) {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_benign_for_create() => Ok(()),
                    Err(e) => Err(e),
                }
            }
            (Err(SyncError::NotFound), Some(super_obj)) => {
                match self
                    .super_client
                    .delete(&super_obj.meta.namespace, &super_obj.meta.name, &super_obj.meta.uid)
                {
                    Ok(()) => Ok(()),
                    Err(e) if e.is_benign_for_delete() => Ok(()),
                    Err(e) => Err(e),
                }
            }
            (Ok(tenant_obj), Some(super_obj)) => {
                let spec = self.mcc.get_spec(&req.cluster)?;
                match self.syncer.check_equality(&super_obj, &tenant_obj, &spec) {
                    Some(patched) => self.super_client.update(patched),
                    None => Ok(()),
                }
            }
            (Err(SyncError::NotFound), None) => Ok(()),
            (Err(e), _) => Err(e),
        }
    }

    /// The upward reconciler (spec.md §4.4): scans the super-side objects
    /// carrying tenancy annotations and writes back whatever `apply_uws`
    /// says should propagate to each object's tenant mirror.
    pub fn start_uws(&self) -> Result<(), SyncError> {
        let supers = self.super_client.list()?;
        for super_obj in supers {
            let (Some(cluster), Some(tenant_namespace)) = (
                super_obj.meta.tenancy_cluster().map(str::to_string),
                super_obj.meta.tenancy_namespace().map(str::to_string),
            ) else {
                continue;
            };
            if super_obj.meta.tenancy_uid().is_none() {
                continue;
            }

            let tenant_obj = match self.mcc.get(&cluster, &tenant_namespace, &super_obj.meta.name) {
                Ok(obj) => obj,
                Err(SyncError::NotFound) => continue,
                Err(e) => {
                    warn!("start_uws: failed to read tenant mirror for {}: {}", super_obj.meta.name, e);
                    continue;
                }
            };

            let spec = match self.mcc.get_spec(&cluster) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!("start_uws: failed to read spec for cluster {}: {}", cluster, e);
                    continue;
                }
            };

            if let Some(patch) = self.syncer.apply_uws(&tenant_obj, &super_obj, &spec) {
                if let Err(e) = self
                    .mcc
                    .update_status(&cluster, &tenant_namespace, &super_obj.meta.name, patch)
                {
                    warn!("start_uws: failed to write tenant mirror for {}: {}", super_obj.meta.name, e);
                }
            }
        }
        Ok(())
    }

    /// The periodic drift detector (spec.md §4.4): joins the super list
    /// against every tenant cluster's list via the `tenancy.uid`
    /// annotation and repairs the four outcomes (UID mismatch, tenant
    /// missing, super missing, both present but unequal).
    pub fn start_patrol(&self) -> Result<(), SyncError> {
        let supers = self.super_client.list()?;
        let mut by_tenant_key: HashMap<(String, String, String), SyncedObject> = HashMap::new();
        for super_obj in supers {
            if let (Some(cluster), Some(namespace)) = (
                super_obj.meta.tenancy_cluster().map(str::to_string),
                super_obj.meta.tenancy_namespace().map(str::to_string),
            ) {
                by_tenant_key.insert((cluster, namespace, super_obj.meta.name.clone()), super_obj);
            }
        }

        for cluster in self.mcc.clusters() {
            let tenants = self.mcc.list(&cluster)?;
            let spec = self.mcc.get_spec(&cluster)?;
            for tenant_obj in &tenants {
                let key = (cluster.clone(), tenant_obj.meta.namespace.clone(), tenant_obj.meta.name.clone());
                match by_tenant_key.remove(&key) {
                    None => {
                        self.metrics.requeued_missing_super.fetch_add(1, Ordering::Relaxed);
                        self.mcc.requeue_object(&cluster, &tenant_obj.meta.namespace, &tenant_obj.meta.name);
                    }
                    Some(super_obj) => {
                        if super_obj.meta.tenancy_uid() != Some(tenant_obj.meta.uid.as_str()) {
                            self.delete_orphan(&super_obj);
                            continue;
                        }
                        if self.syncer.check_equality(&super_obj, tenant_obj, &spec).is_some() {
                            self.metrics.requeued_drift.fetch_add(1, Ordering::Relaxed);
                            self.mcc.requeue_object(&cluster, &tenant_obj.meta.namespace, &tenant_obj.meta.name);
                        }
                    }
                }
            }
        }

        for (_, super_obj) in by_tenant_key {
            self.delete_orphan(&super_obj);
        }

        Ok(())
    }

    /// Deletes an orphaned super object with a UID precondition matching
    /// the super object's *own* UID, not the tenancy annotation (spec.md
    /// §8, scenario S7).
    fn delete_orphan(&self, super_obj: &SyncedObject) {
        match self
            .super_client
            .delete(&super_obj.meta.namespace, &super_obj.meta.name, &super_obj.meta.uid)
        {
            Ok(()) => {
                self.metrics.deleted_orphan_super.fetch_add(1, Ordering::Relaxed);
                info!("patrol deleted orphan super object {}/{}", super_obj.meta.namespace, super_obj.meta.name);
            }
            Err(e) if e.is_benign_for_delete() => {}
            Err(e) => warn!(
                "patrol failed to delete orphan super object {}/{}: {}",
                super_obj.meta.namespace, super_obj.meta.name, e
            ),
        }
    }
}

pub struct StopHandle {
    tx: mpsc::Sender<()>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl StopHandle {
    pub fn stop(mut self) {
        let _ = self.tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns the periodic patrol loop for `engine`, the same wall-clock timer
/// shape as [`crate::core::gc::spawn_shadow_gc`] (spec.md §4.4, §5).
pub fn spawn_patrol(engine: Arc<SyncerEngine>, interval: Duration) -> StopHandle {
    let (tx, rx) = mpsc::channel::<()>();
    let join = std::thread::spawn(move || loop {
        match rx.recv_timeout(interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Err(e) = engine.start_patrol() {
                    warn!("patrol pass for {} failed: {}", engine.syncer.kind(), e);
                }
            }
        }
    });
    StopHandle { tx, join: Some(join) }
}

/// Spawns the periodic upward-sync loop for `engine`.
pub fn spawn_uws(engine: Arc<SyncerEngine>, interval: Duration) -> StopHandle {
    let (tx, rx) = mpsc::channel::<()>();
    let join = std::thread::spawn(move || loop {
        match rx.recv_timeout(interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Err(e) = engine.start_uws() {
                    warn!("uws pass for {} failed: {}", engine.syncer.kind(), e);
                }
            }
        }
    });
    StopHandle { tx, join: Some(join) }
}
