//! Process-wide registry of tenants, physical clusters, tenant namespaces
//! and tenant pods (spec.md §4.2).
//!
//! **Concurrency**: a single `RwLock` guards the entire cache state. Every
//! mutating operation takes it exclusively for the duration of its
//! scratch-copy rollback dance (spec.md §5: cross-cluster transactions are
//! never I/O, so holding one global lock for a multi-placement namespace
//! add is cheap). Read operations that return owned data also take the
//! lock, briefly, to clone; they never hold it across a caller boundary.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::core::cluster::PhysicalCluster;
use crate::core::common::{namespace_key, ResourceList};
use crate::core::ledger::Slice;
use crate::core::namespace::Namespace;
use crate::core::pod::Pod;
use crate::error::CacheError;

/// Per-cluster view handed to the re-scheduling planner
/// (`SnapshotForNamespaceSched`, spec.md §4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSchedSnapshot {
    pub capacity: ResourceList,
    pub alloc: ResourceList,
    pub provision: ResourceList,
}

/// Per-cluster view handed to the pod scheduler (`SnapshotForPodSched`,
/// spec.md §4.2): capacity is this namespace's placement share, alloc is
/// the sum of sibling pod requests already bound to that cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct PodSchedSnapshot {
    pub capacity: ResourceList,
    pub alloc: ResourceList,
}

#[derive(Default)]
struct CacheState {
    tenants: HashSet<String>,
    clusters: HashMap<String, PhysicalCluster>,
    namespaces: HashMap<String, Namespace>,
    pods: HashMap<String, Pod>,
}

pub struct SchedulerCacheConfig {
    pub shadow_quiescence: Duration,
}

impl Default for SchedulerCacheConfig {
    fn default() -> Self {
        Self {
            shadow_quiescence: Duration::from_secs(5 * 60),
        }
    }
}

pub struct SchedulerCache {
    state: std::sync::RwLock<CacheState>,
    config: SchedulerCacheConfig,
}

impl Default for SchedulerCache {
    fn default() -> Self {
        Self::new(SchedulerCacheConfig::default())
    }
}

impl SchedulerCache {
    pub fn new(config: SchedulerCacheConfig) -> Self {
        Self {
            state: std::sync::RwLock::new(CacheState::default()),
            config,
        }
    }

    // ---- Tenant lifecycle -------------------------------------------------

    pub fn add_tenant(&self, name: &str) {
        let mut state = self.state.write().unwrap();
        state.tenants.insert(name.to_string());
    }

    /// Removes the tenant and every namespace it owns. On the first
    /// namespace-removal failure, the namespaces already removed are
    /// re-added (in reverse order) and the tenant set is left untouched
    /// (spec.md §4.2, §8 invariant 5).
    pub fn remove_tenant(&self, name: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        if !state.tenants.contains(name) {
            return Ok(());
        }

        let owned: Vec<Namespace> = state
            .namespaces
            .values()
            .filter(|ns| ns.owner == name)
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(owned.len());
        for ns in &owned {
            match Self::remove_namespace_locked(&mut state, ns) {
                Ok(()) => removed.push(ns.clone()),
                Err(err) => {
                    for restore in removed.into_iter().rev() {
                        if let Err(restore_err) = Self::add_namespace_locked(&mut state, &restore)
                        {
                            warn!(
                                "remove_tenant rollback failed to restore namespace {}: {}",
                                restore.key(),
                                restore_err
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }

        state.tenants.remove(name);
        Ok(())
    }

    pub fn has_tenant(&self, name: &str) -> bool {
        self.state.read().unwrap().tenants.contains(name)
    }

    // ---- Namespace lifecycle (two-phase commit across placements) --------

    /// No-op (returns `Ok(())` without mutating anything) if `ns.owner` is
    /// not a registered tenant — a silent skip, per the source behavior
    /// documented as the chosen option in spec.md §9's design note.
    pub fn add_namespace(&self, ns: &Namespace) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        if !state.tenants.contains(&ns.owner) {
            debug!(
                "add_namespace: tenant {} not registered, skipping {} silently",
                ns.owner,
                ns.key()
            );
            return Ok(());
        }
        if state.namespaces.contains_key(&ns.key()) {
            let old = state.namespaces.get(&ns.key()).unwrap().clone();
            return Self::update_namespace_locked(&mut state, &old, ns);
        }
        Self::add_namespace_locked(&mut state, ns)
    }

    pub fn remove_namespace(&self, ns: &Namespace) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        Self::remove_namespace_locked(&mut state, ns)
    }

    /// `remove(old)` then `add(new)`; if `add` fails, re-adds `old`. If the
    /// re-add of `old` also fails, the cache is left without the namespace
    /// entirely — spec.md §9 treats the source's silent swallow of that
    /// second failure as an invariant violation and requires a distinct
    /// error so callers trigger a full resync.
    pub fn update_namespace(&self, old: &Namespace, new: &Namespace) -> Result<(), CacheError> {
        assert_eq!(old.key(), new.key(), "update_namespace requires identical keys");
        let mut state = self.state.write().unwrap();
        Self::update_namespace_locked(&mut state, old, new)
    }

    fn update_namespace_locked(
        state: &mut CacheState,
        old: &Namespace,
        new: &Namespace,
    ) -> Result<(), CacheError> {
        Self::remove_namespace_locked(state, old)?;
        if let Err(add_err) = Self::add_namespace_locked(state, new) {
            if let Err(restore_err) = Self::add_namespace_locked(state, old) {
                warn!(
                    "update_namespace: cache corrupted, could not restore {} after failed update ({}); restore also failed: {}",
                    old.key(),
                    add_err,
                    restore_err
                );
                return Err(CacheError::RollbackFailed { namespace: old.key() });
            }
            return Err(add_err);
        }
        Ok(())
    }

    fn add_namespace_locked(state: &mut CacheState, ns: &Namespace) -> Result<(), CacheError> {
        let expected = ns.slice_count().ok_or_else(|| CacheError::InconsistentSchedule {
            namespace: ns.key(),
            expected: 0,
            actual: ns.schedule.iter().map(|p| p.num as u64).sum(),
        })?;
        let actual: u64 = ns.schedule.iter().map(|p| p.num as u64).sum();
        if actual != expected {
            return Err(CacheError::InconsistentSchedule {
                namespace: ns.key(),
                expected,
                actual,
            });
        }

        let key = ns.key();
        let mut committed: Vec<String> = Vec::new();
        for placement in &ns.schedule {
            if !state.clusters.contains_key(&placement.cluster) {
                state.clusters.insert(
                    placement.cluster.clone(),
                    PhysicalCluster::new_shadow(placement.cluster.clone()),
                );
            }
            let cluster = state.clusters.get_mut(&placement.cluster).unwrap();
            let slices: Vec<Slice> = (0..placement.num)
                .map(|_| Slice {
                    owner: key.clone(),
                    size: ns.quota_slice.clone(),
                    cluster: placement.cluster.clone(),
                })
                .collect();

            match cluster.add_namespace_slices(&key, slices) {
                Ok(()) => {
                    cluster.touch();
                    committed.push(placement.cluster.clone());
                }
                Err(ledger_err) => {
                    for cluster_name in committed.iter().rev() {
                        if let Some(c) = state.clusters.get_mut(cluster_name) {
                            let _ = c.remove_namespace_slices(&key);
                        }
                    }
                    return Err(CacheError::ledger(placement.cluster.clone(), ledger_err));
                }
            }
        }

        state.namespaces.insert(key, ns.clone());
        Ok(())
    }

    fn remove_namespace_locked(state: &mut CacheState, ns: &Namespace) -> Result<(), CacheError> {
        let key = ns.key();
        let mut removed: Vec<(String, Vec<Slice>)> = Vec::new();
        for placement in &ns.schedule {
            let cluster = match state.clusters.get_mut(&placement.cluster) {
                Some(c) => c,
                None => {
                    Self::restore_removed(state, &key, &removed);
                    return Err(CacheError::ClusterNotFound(placement.cluster.clone()));
                }
            };
            let slices = cluster.alloc_items(&key).map(|s| s.to_vec());
            match cluster.remove_namespace_slices(&key) {
                Ok(()) => {
                    if let Some(slices) = slices {
                        removed.push((placement.cluster.clone(), slices));
                    }
                }
                Err(ledger_err) => {
                    Self::restore_removed(state, &key, &removed);
                    return Err(CacheError::ledger(placement.cluster.clone(), ledger_err));
                }
            }
        }
        state.namespaces.remove(&key);
        Ok(())
    }

    fn restore_removed(state: &mut CacheState, key: &str, removed: &[(String, Vec<Slice>)]) {
        for (cluster_name, slices) in removed.iter().rev() {
            if let Some(cluster) = state.clusters.get_mut(cluster_name) {
                if let Err(err) = cluster.add_namespace_slices(key, slices.clone()) {
                    warn!(
                        "remove_namespace rollback failed to restore {} on {}: {}",
                        key, cluster_name, err
                    );
                }
            }
        }
    }

    pub fn get_namespace(&self, key: &str) -> Option<Namespace> {
        self.state.read().unwrap().namespaces.get(key).cloned()
    }

    // ---- Pod lifecycle ------------------------------------------------

    pub fn add_pod(&self, pod: &Pod) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        let key = pod.key();
        let prior = state.pods.get(&key).cloned();

        match prior {
            Some(prior) if prior.cluster != pod.cluster => {
                if let Some(cluster) = state.clusters.get_mut(&prior.cluster) {
                    cluster.remove_pod(&prior.namespace_key(), &prior.name);
                }
                let cluster = state
                    .clusters
                    .entry(pod.cluster.clone())
                    .or_insert_with(|| PhysicalCluster::new_shadow(pod.cluster.clone()));
                cluster.add_pod(&pod.namespace_key(), &pod.name);
            }
            Some(_) => {
                // Same cluster: index already correct, just overwrite below.
            }
            None => {
                let cluster = state
                    .clusters
                    .entry(pod.cluster.clone())
                    .or_insert_with(|| PhysicalCluster::new_shadow(pod.cluster.clone()));
                cluster.add_pod(&pod.namespace_key(), &pod.name);
            }
        }

        state.pods.insert(key, pod.clone());
        Ok(())
    }

    /// Idempotent: a pod with no prior cache entry is a no-op success. If
    /// the argument's `cluster` disagrees with the cached entry's, a
    /// warning is logged but the deletion proceeds using the cached
    /// entry's cluster (spec.md §4.2).
    pub fn remove_pod(&self, pod: &Pod) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        let key = pod.key();
        let cached = match state.pods.remove(&key) {
            Some(cached) => cached,
            None => return Ok(()),
        };
        if cached.cluster != pod.cluster {
            warn!(
                "remove_pod: argument cluster {} disagrees with cached cluster {} for {}, using cached",
                pod.cluster, cached.cluster, key
            );
        }
        if let Some(cluster) = state.clusters.get_mut(&cached.cluster) {
            cluster.remove_pod(&cached.namespace_key(), &cached.name);
        }
        Ok(())
    }

    pub fn get_pod(&self, key: &str) -> Option<Pod> {
        self.state.read().unwrap().pods.get(key).cloned()
    }

    // ---- Cluster lifecycle ---------------------------------------------

    pub fn add_cluster(
        &self,
        name: &str,
        labels: std::collections::BTreeMap<String, String>,
        capacity: ResourceList,
    ) {
        let mut state = self.state.write().unwrap();
        match state.clusters.get_mut(name) {
            Some(existing) => {
                existing.labels = labels;
                existing.capacity = capacity;
                existing.shadow = false;
                existing.touch();
            }
            None => {
                state
                    .clusters
                    .insert(name.to_string(), PhysicalCluster::new(name.to_string(), labels, capacity));
            }
        }
    }

    pub fn remove_cluster(&self, name: &str) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        state
            .clusters
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CacheError::ClusterNotFound(name.to_string()))
    }

    pub fn update_cluster_capacity(
        &self,
        name: &str,
        capacity: ResourceList,
    ) -> Result<(), CacheError> {
        let mut state = self.state.write().unwrap();
        let cluster = state
            .clusters
            .get_mut(name)
            .ok_or_else(|| CacheError::ClusterNotFound(name.to_string()))?;
        cluster.capacity = capacity;
        cluster.touch();
        Ok(())
    }

    pub fn get_cluster(&self, name: &str) -> Option<PhysicalCluster> {
        self.state.read().unwrap().clusters.get(name).cloned()
    }

    /// Deletes every shadow cluster whose `last_update` is older than the
    /// configured quiescence interval, run periodically by
    /// [`crate::core::gc::spawn_shadow_gc`] (spec.md §4.2).
    pub fn gc_shadow_clusters(&self) -> Vec<String> {
        let mut state = self.state.write().unwrap();
        let now = Instant::now();
        let quiescence = self.config.shadow_quiescence;
        let stale: Vec<String> = state
            .clusters
            .values()
            .filter(|c| c.shadow && now.duration_since(c.last_update) >= quiescence)
            .map(|c| c.name.clone())
            .collect();
        for name in &stale {
            state.clusters.remove(name);
        }
        stale
    }

    // ---- Snapshots -------------------------------------------------------

    /// Snapshot for the re-scheduling planner: every non-shadow cluster's
    /// `{capacity, alloc, provision}`, with the slices of each namespace in
    /// `ns_to_remove` subtracted from the relevant clusters' `alloc`
    /// (spec.md §4.2).
    pub fn snapshot_for_namespace_sched(
        &self,
        ns_to_remove: &[Namespace],
    ) -> Result<HashMap<String, ClusterSchedSnapshot>, CacheError> {
        let state = self.state.read().unwrap();
        let mut snapshot: HashMap<String, ClusterSchedSnapshot> = state
            .clusters
            .values()
            .filter(|c| !c.shadow)
            .map(|c| {
                (
                    c.name.clone(),
                    ClusterSchedSnapshot {
                        capacity: c.capacity.clone(),
                        alloc: c.alloc().clone(),
                        provision: c.provision().clone(),
                    },
                )
            })
            .collect();

        for ns in ns_to_remove {
            let key = ns.key();
            for placement in &ns.schedule {
                let cluster = match state.clusters.get(&placement.cluster) {
                    Some(c) => c,
                    None => {
                        return Err(CacheError::InconsistentCache {
                            namespace: key,
                            reason: format!("cluster {} not found", placement.cluster),
                        })
                    }
                };
                let slices = cluster.alloc_items(&key).ok_or_else(|| CacheError::InconsistentCache {
                    namespace: key.clone(),
                    reason: format!("no allocation items on {}", placement.cluster),
                })?;
                if let Some(view) = snapshot.get_mut(&placement.cluster) {
                    for slice in slices {
                        for (res_key, qty) in &slice.size {
                            if let Some(entry) = view.alloc.get_mut(res_key) {
                                *entry -= qty;
                            }
                        }
                    }
                }
            }
        }

        Ok(snapshot)
    }

    /// Snapshot for the pod scheduler: for each of the namespace's
    /// placements, `capacity = num * quotaSlice`, and `alloc` accumulates
    /// the `request` of every other pod of the same namespace currently
    /// indexed (spec.md §4.2).
    pub fn snapshot_for_pod_sched(
        &self,
        pod: &Pod,
    ) -> Result<HashMap<String, PodSchedSnapshot>, CacheError> {
        let state = self.state.read().unwrap();
        let ns_key = pod.namespace_key();
        let ns = state
            .namespaces
            .get(&ns_key)
            .ok_or_else(|| CacheError::NamespaceNotFound(ns_key.clone()))?;

        let mut snapshot: HashMap<String, PodSchedSnapshot> = HashMap::new();
        for placement in &ns.schedule {
            let mut capacity = ResourceList::new();
            crate::core::common::add_scaled(&mut capacity, &ns.quota_slice, placement.num as i64);
            snapshot.insert(
                placement.cluster.clone(),
                PodSchedSnapshot {
                    capacity,
                    alloc: ResourceList::new(),
                },
            );
        }

        let excluded_key = pod.key();
        for other in state.pods.values() {
            if other.key() == excluded_key {
                continue;
            }
            if other.namespace_key() != ns_key {
                continue;
            }
            if let Some(view) = snapshot.get_mut(&other.cluster) {
                crate::core::common::add_scaled(&mut view.alloc, &other.request, 1);
            }
        }

        Ok(snapshot)
    }

    /// Human-readable listing of clusters, namespaces and pods, for
    /// operator debugging (spec.md §4.2).
    pub fn dump(&self) -> String {
        let state = self.state.read().unwrap();
        let mut out = String::new();
        out.push_str("== clusters ==\n");
        let mut cluster_names: Vec<_> = state.clusters.keys().collect();
        cluster_names.sort();
        for name in cluster_names {
            let c = &state.clusters[name];
            out.push_str(&format!(
                "  {} shadow={} capacity={:?} alloc={:?} provision={:?}\n",
                name,
                c.shadow,
                c.capacity,
                c.alloc(),
                c.provision()
            ));
        }
        out.push_str("== namespaces ==\n");
        let mut ns_keys: Vec<_> = state.namespaces.keys().collect();
        ns_keys.sort();
        for key in ns_keys {
            let ns = &state.namespaces[key];
            out.push_str(&format!(
                "  {} quota={:?} quotaSlice={:?} schedule={:?}\n",
                key, ns.quota, ns.quota_slice, ns.schedule
            ));
        }
        out.push_str("== pods ==\n");
        let mut pod_keys: Vec<_> = state.pods.keys().collect();
        pod_keys.sort();
        for key in pod_keys {
            let pod = &state.pods[key];
            out.push_str(&format!("  {} cluster={} request={:?}\n", key, pod.cluster, pod.request));
        }
        out
    }
}

/// Process-wide handle combining the cache with the "dirty" cluster
/// bookkeeping of spec.md §9's design note: clusters that failed initial
/// bootstrap and must be re-synced before serving scheduling requests.
/// Modeled as a field of this value, never a package-level singleton.
pub struct Scheduler {
    pub cache: std::sync::Arc<SchedulerCache>,
    dirty_virtual_clusters: std::sync::Mutex<HashSet<String>>,
    dirty_super_clusters: std::sync::Mutex<HashSet<String>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerCache::default())
    }
}

impl Scheduler {
    pub fn new(cache: SchedulerCache) -> Self {
        Self::with_shared_cache(std::sync::Arc::new(cache))
    }

    pub fn with_shared_cache(cache: std::sync::Arc<SchedulerCache>) -> Self {
        Self {
            cache,
            dirty_virtual_clusters: std::sync::Mutex::new(HashSet::new()),
            dirty_super_clusters: std::sync::Mutex::new(HashSet::new()),
        }
    }

    pub fn mark_virtual_cluster_dirty(&self, name: &str) {
        self.dirty_virtual_clusters.lock().unwrap().insert(name.to_string());
    }

    pub fn clear_virtual_cluster_dirty(&self, name: &str) {
        self.dirty_virtual_clusters.lock().unwrap().remove(name);
    }

    pub fn is_virtual_cluster_dirty(&self, name: &str) -> bool {
        self.dirty_virtual_clusters.lock().unwrap().contains(name)
    }

    pub fn mark_super_cluster_dirty(&self, name: &str) {
        self.dirty_super_clusters.lock().unwrap().insert(name.to_string());
    }

    pub fn clear_super_cluster_dirty(&self, name: &str) {
        self.dirty_super_clusters.lock().unwrap().remove(name);
    }

    pub fn is_super_cluster_dirty(&self, name: &str) -> bool {
        self.dirty_super_clusters.lock().unwrap().contains(name)
    }
}
