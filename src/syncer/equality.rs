//! `CheckEquality`: the shared downward-equality rules of spec.md §4.4.

use std::collections::BTreeMap;

use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::object::{EndpointSubset, SyncedObject};

/// Merges a metadata map (labels or annotations) the way spec.md §4.4/§6
/// requires: tenant values win for every non-opaque key, and the super
/// side's opaque-prefixed entries are preserved (spec.md S6).
pub fn merge_meta_map(
    super_map: &BTreeMap<String, String>,
    tenant_map: &BTreeMap<String, String>,
    spec: &VirtualClusterSpec,
) -> BTreeMap<String, String> {
    let mut merged: BTreeMap<String, String> = tenant_map
        .iter()
        .filter(|(k, _)| !spec.is_opaque(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (k, v) in super_map {
        if spec.is_opaque(k) {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

fn normalize_subsets(subsets: &[EndpointSubset]) -> Vec<EndpointSubset> {
    let mut normalized = subsets.to_vec();
    normalized.sort_by(|a, b| {
        (&a.target_ref_namespace, &a.target_ref_name).cmp(&(&b.target_ref_namespace, &b.target_ref_name))
    });
    for subset in &mut normalized {
        subset.addresses.sort();
    }
    normalized
}

/// Computes whether `super_obj` needs to change to match `tenant_obj`
/// under `spec`'s prefix rules. Returns the patched object to write back,
/// or `None` if already equal.
///
/// Reflexive and stable (spec.md §8 invariant 6): comparing an object
/// against itself always returns `None`, and applying the returned patch
/// makes a second comparison against the same tenant object also return
/// `None`.
pub fn check_equality(
    super_obj: &SyncedObject,
    tenant_obj: &SyncedObject,
    spec: &VirtualClusterSpec,
) -> Option<SyncedObject> {
    let mut updated = super_obj.clone();
    let mut changed = false;

    let merged_labels = merge_meta_map(&super_obj.meta.labels, &tenant_obj.meta.labels, spec);
    if merged_labels != super_obj.meta.labels {
        updated.meta.labels = merged_labels;
        changed = true;
    }

    let merged_annotations = merge_meta_map(&super_obj.meta.annotations, &tenant_obj.meta.annotations, spec);
    if merged_annotations != super_obj.meta.annotations {
        updated.meta.annotations = merged_annotations;
        changed = true;
    }

    if super_obj.meta.generate_name != tenant_obj.meta.generate_name {
        updated.meta.generate_name = tenant_obj.meta.generate_name.clone();
        changed = true;
    }

    if super_obj.meta.cluster_name != tenant_obj.meta.cluster_name {
        updated.meta.cluster_name = tenant_obj.meta.cluster_name.clone();
        changed = true;
    }

    if super_obj.body.containers != tenant_obj.body.containers {
        updated.body.containers = tenant_obj.body.containers.clone();
        changed = true;
    }

    if super_obj.body.active_deadline_seconds != tenant_obj.body.active_deadline_seconds {
        updated.body.active_deadline_seconds = tenant_obj.body.active_deadline_seconds;
        changed = true;
    }

    if super_obj.body.data != tenant_obj.body.data {
        updated.body.data = tenant_obj.body.data.clone();
        changed = true;
    }

    let super_subsets = normalize_subsets(&super_obj.body.subsets);
    let tenant_subsets = normalize_subsets(&tenant_obj.body.subsets);
    if super_subsets != tenant_subsets {
        updated.body.subsets = tenant_subsets;
        changed = true;
    }

    changed.then_some(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncer::object::ObjectMeta;

    fn spec_with_opaque(prefix: &str) -> VirtualClusterSpec {
        VirtualClusterSpec {
            opaque_meta_prefixes: vec![prefix.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn reflexive_on_identical_objects() {
        let obj = SyncedObject {
            meta: ObjectMeta {
                name: "p".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let spec = VirtualClusterSpec::default();
        assert_eq!(check_equality(&obj, &obj, &spec), None);
    }

    #[test]
    fn opaque_prefix_preserved_and_tenant_label_merged() {
        let spec = spec_with_opaque("tenancy.x-k8s.io");
        let mut super_obj = SyncedObject::default();
        super_obj
            .meta
            .labels
            .insert("tenancy.x-k8s.io/uid".into(), "abc".into());
        let mut tenant_obj = SyncedObject::default();
        tenant_obj.meta.labels.insert("app".into(), "x".into());

        let updated = check_equality(&super_obj, &tenant_obj, &spec).expect("labels differ");
        let mut expected = BTreeMap::new();
        expected.insert("tenancy.x-k8s.io/uid".to_string(), "abc".to_string());
        expected.insert("app".to_string(), "x".to_string());
        assert_eq!(updated.meta.labels, expected);
    }

    #[test]
    fn applying_patch_is_stable() {
        let spec = spec_with_opaque("tenancy.x-k8s.io");
        let mut super_obj = SyncedObject::default();
        super_obj
            .meta
            .labels
            .insert("tenancy.x-k8s.io/uid".into(), "abc".into());
        let mut tenant_obj = SyncedObject::default();
        tenant_obj.meta.labels.insert("app".into(), "x".into());

        let updated = check_equality(&super_obj, &tenant_obj, &spec).unwrap();
        assert_eq!(check_equality(&updated, &tenant_obj, &spec), None);
    }

    #[test]
    fn protected_prefix_not_treated_as_opaque() {
        let spec = VirtualClusterSpec {
            opaque_meta_prefixes: vec!["tenancy.x-k8s.io".to_string()],
            protected_meta_prefixes: vec!["tenancy.x-k8s.io/protected".to_string()],
            ..Default::default()
        };
        let mut super_obj = SyncedObject::default();
        super_obj
            .meta
            .labels
            .insert("tenancy.x-k8s.io/protected/owner".into(), "super-value".into());
        let mut tenant_obj = SyncedObject::default();
        tenant_obj
            .meta
            .labels
            .insert("tenancy.x-k8s.io/protected/owner".into(), "tenant-value".into());

        let updated = check_equality(&super_obj, &tenant_obj, &spec).expect("tenant value should win");
        assert_eq!(
            updated.meta.labels["tenancy.x-k8s.io/protected/owner"],
            "tenant-value"
        );
    }
}
