//! In-memory test doubles and builders (spec.md §6; SPEC_FULL.md §2, §6).
//!
//! Mirrors the teacher's `src/test_util/helpers.rs`: a normal (not
//! `#[cfg(test)]`-gated) module so both the colocated unit tests and the
//! `tests/` integration suite can build cache entities and a self-contained
//! tenant/super apiserver pair without any real cluster connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::client::{SuperClient, TenantClient};
use crate::core::cluster::PhysicalCluster;
use crate::core::common::ResourceList;
use crate::core::namespace::{Namespace, Placement};
use crate::core::pod::Pod;
use crate::error::SyncError;
use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::object::SyncedObject;

pub fn resources(pairs: &[(&str, i64)]) -> ResourceList {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn cluster(name: &str, capacity: &[(&str, i64)]) -> PhysicalCluster {
    PhysicalCluster::new(name.to_string(), BTreeMap::new(), resources(capacity))
}

pub fn namespace(owner: &str, name: &str, quota: &[(&str, i64)], quota_slice: &[(&str, i64)], schedule: Vec<(&str, u32)>) -> Namespace {
    Namespace {
        owner: owner.to_string(),
        name: name.to_string(),
        labels: BTreeMap::new(),
        quota: resources(quota),
        quota_slice: resources(quota_slice),
        schedule: schedule
            .into_iter()
            .map(|(cluster, num)| Placement {
                cluster: cluster.to_string(),
                num,
            })
            .collect(),
    }
}

pub fn pod(owner: &str, namespace: &str, name: &str, uid: &str, request: &[(&str, i64)], cluster: &str) -> Pod {
    Pod {
        owner: owner.to_string(),
        namespace: namespace.to_string(),
        name: name.to_string(),
        uid: uid.to_string(),
        request: resources(request),
        cluster: cluster.to_string(),
    }
}

/// A process-wide, in-memory stand-in for one tenant cluster's apiserver:
/// backs both `TenantClient::get/list` (informer-cache reads) and
/// `update_status` (the UWS write-back), and a secondary object-type list
/// for `list_by_object_type` cross-checks (spec.md §4.3).
pub struct InMemoryTenantClient {
    objects: Mutex<HashMap<(String, String), SyncedObject>>,
    secondary: Mutex<HashMap<String, Vec<SyncedObject>>>,
    spec: VirtualClusterSpec,
}

impl InMemoryTenantClient {
    pub fn new(spec: VirtualClusterSpec) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            secondary: Mutex::new(HashMap::new()),
            spec,
        }
    }

    pub fn put(&self, obj: SyncedObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((obj.meta.namespace.clone(), obj.meta.name.clone()), obj);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.objects.lock().unwrap().remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn put_secondary(&self, object_type: &str, objs: Vec<SyncedObject>) {
        self.secondary.lock().unwrap().insert(object_type.to_string(), objs);
    }
}

impl TenantClient<SyncedObject> for InMemoryTenantClient {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<SyncedObject>, SyncError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    fn list(&self) -> Result<Vec<SyncedObject>, SyncError> {
        Ok(self.objects.lock().unwrap().values().cloned().collect())
    }

    fn list_by_object_type(&self, object_type: &str) -> Result<Vec<SyncedObject>, SyncError> {
        Ok(self.secondary.lock().unwrap().get(object_type).cloned().unwrap_or_default())
    }

    fn spec(&self) -> VirtualClusterSpec {
        self.spec.clone()
    }

    fn update_status(&self, namespace: &str, name: &str, obj: SyncedObject) -> Result<(), SyncError> {
        self.objects
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), obj);
        Ok(())
    }
}

/// A process-wide, in-memory stand-in for the single super cluster's
/// apiserver, enforcing the `AlreadyExists`/`NotFound`/UID-precondition
/// rules the real syncer relies on (spec.md §4.4, §7).
#[derive(Default)]
pub struct InMemorySuperClient {
    objects: Mutex<HashMap<(String, String), SyncedObject>>,
}

impl InMemorySuperClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SuperClient<SyncedObject> for InMemorySuperClient {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<SyncedObject>, SyncError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    fn list(&self) -> Result<Vec<SyncedObject>, SyncError> {
        Ok(self.objects.lock().unwrap().values().cloned().collect())
    }

    fn create(&self, obj: SyncedObject) -> Result<(), SyncError> {
        let key = (obj.meta.namespace.clone(), obj.meta.name.clone());
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(SyncError::AlreadyExists);
        }
        let mut obj = obj;
        if obj.meta.uid.is_empty() {
            obj.meta.uid = uuid::Uuid::new_v4().to_string();
        }
        objects.insert(key, obj);
        Ok(())
    }

    fn update(&self, obj: SyncedObject) -> Result<(), SyncError> {
        let key = (obj.meta.namespace.clone(), obj.meta.name.clone());
        let mut objects = self.objects.lock().unwrap();
        if !objects.contains_key(&key) {
            return Err(SyncError::NotFound);
        }
        objects.insert(key, obj);
        Ok(())
    }

    fn delete(&self, namespace: &str, name: &str, uid_precondition: &str) -> Result<(), SyncError> {
        let key = (namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().unwrap();
        match objects.get(&key) {
            None => Err(SyncError::NotFound),
            Some(existing) if existing.meta.uid != uid_precondition => Err(SyncError::UidMismatch),
            Some(_) => {
                objects.remove(&key);
                Ok(())
            }
        }
    }
}
