//! Tenant pod as tracked by the scheduler cache (spec.md §3).
//!
//! Pod-key convention (spec.md §9 design note): this implementation uses the
//! **uid-based** key `owner/namespace/uid` consistently for global cache
//! indexing. Name-based keys collide across pod recreation; uid-based keys
//! match Kubernetes' own identity semantics and are used uniformly in the
//! cache's pod map, a cluster's per-namespace pod-name index, and snapshot
//! reconciliation.

use crate::core::common::{pod_key, ResourceList};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pod {
    pub owner: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub request: ResourceList,
    pub cluster: String,
}

impl Pod {
    pub fn key(&self) -> String {
        pod_key(&self.owner, &self.namespace, &self.uid)
    }

    pub fn namespace_key(&self) -> String {
        crate::core::common::namespace_key(&self.owner, &self.namespace)
    }
}
