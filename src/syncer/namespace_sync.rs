//! Namespace `ResourceSyncer` (spec.md §4.4's second reference kind):
//! create/delete passthrough, equality limited to labels.

use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::equality::merge_meta_map;
use crate::syncer::metadata::{build_metadata, mark_vc_root_namespace};
use crate::syncer::object::SyncedObject;
use crate::syncer::ResourceSyncer;

/// `mark_root` is set for a tenant's root namespace, the GC target carrying
/// `tenancy.vc-root-ns=true` (spec.md §6).
pub struct NamespaceSyncer {
    mark_root: bool,
}

impl NamespaceSyncer {
    pub fn new(mark_root: bool) -> Self {
        Self { mark_root }
    }
}

impl ResourceSyncer for NamespaceSyncer {
    fn kind(&self) -> &'static str {
        "Namespace"
    }

    fn build_super_object(&self, tenant: &SyncedObject, cluster: &str, _spec: &VirtualClusterSpec) -> SyncedObject {
        let mut built = tenant.clone();
        built.meta = build_metadata(&tenant.meta, cluster, None);
        if self.mark_root {
            mark_vc_root_namespace(&mut built);
        }
        built
    }

    /// No equality beyond labels (spec.md §4.2's reference-kind note):
    /// namespace bodies carry no container/image/data fields worth
    /// diffing, so this kind skips the shared `check_equality` rules.
    fn check_equality(
        &self,
        super_obj: &SyncedObject,
        tenant_obj: &SyncedObject,
        spec: &VirtualClusterSpec,
    ) -> Option<SyncedObject> {
        let merged = merge_meta_map(&super_obj.meta.labels, &tenant_obj.meta.labels, spec);
        if merged == super_obj.meta.labels {
            None
        } else {
            let mut updated = super_obj.clone();
            updated.meta.labels = merged;
            Some(updated)
        }
    }

    fn apply_uws(
        &self,
        tenant_obj: &SyncedObject,
        super_obj: &SyncedObject,
        spec: &VirtualClusterSpec,
    ) -> Option<SyncedObject> {
        let mut patched = tenant_obj.clone();
        let mut changed = false;
        for (key, value) in &super_obj.meta.annotations {
            if spec.is_transparent(key) && tenant_obj.meta.annotations.get(key) != Some(value) {
                patched.meta.annotations.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed.then_some(patched)
    }
}
