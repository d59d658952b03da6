//! The annotation contract and naming rule of spec.md §6.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::syncer::object::{ObjectMeta, SyncedObject};

pub const ANNOTATION_CLUSTER: &str = "tenancy.cluster";
pub const ANNOTATION_UID: &str = "tenancy.uid";
pub const ANNOTATION_NAMESPACE: &str = "tenancy.namespace";
pub const ANNOTATION_OWNER_REFERENCES: &str = "tenancy.ownerReferences";
pub const ANNOTATION_VC_ROOT_NS: &str = "tenancy.vc-root-ns";

const MAX_NAME_LENGTH: usize = 253;
const TRUNCATED_PREFIX_LENGTH: usize = 57;
const HASH_SUFFIX_LENGTH: usize = 5;

/// `superNamespace = cluster + "-" + ns`, truncated with a content hash
/// suffix when it would exceed 253 characters (spec.md §6).
pub fn super_namespace(cluster: &str, namespace: &str) -> String {
    let candidate = format!("{cluster}-{namespace}");
    if candidate.len() <= MAX_NAME_LENGTH {
        return candidate;
    }
    let mut hasher = Sha256::new();
    hasher.update(candidate.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let prefix: String = candidate.chars().take(TRUNCATED_PREFIX_LENGTH).collect();
    format!("{}-{}", prefix, &hex[..HASH_SUFFIX_LENGTH])
}

/// A tenant pod's super-side name is simply `pod.name` (spec.md §6).
pub fn super_pod_name(tenant_name: &str) -> String {
    tenant_name.to_string()
}

/// Builds the super-side metadata for a newly-created object from its
/// tenant-side metadata, annotating ownership per spec.md §6.
pub fn build_metadata(
    tenant_meta: &ObjectMeta,
    cluster: &str,
    owner_references_json: Option<String>,
) -> ObjectMeta {
    let mut annotations = tenant_meta.annotations.clone();
    annotations.insert(ANNOTATION_CLUSTER.to_string(), cluster.to_string());
    annotations.insert(ANNOTATION_UID.to_string(), tenant_meta.uid.clone());
    annotations.insert(
        ANNOTATION_NAMESPACE.to_string(),
        tenant_meta.namespace.clone(),
    );
    if let Some(owner_refs) = owner_references_json {
        annotations.insert(ANNOTATION_OWNER_REFERENCES.to_string(), owner_refs);
    }

    ObjectMeta {
        name: tenant_meta.name.clone(),
        namespace: super_namespace(cluster, &tenant_meta.namespace),
        // Assigned by the super apiserver on create; not known yet.
        uid: String::new(),
        generate_name: tenant_meta.generate_name.clone(),
        cluster_name: tenant_meta.cluster_name.clone(),
        labels: tenant_meta.labels.clone(),
        annotations,
    }
}

/// A tenant object's ownerReference, carried across to the super side as the
/// JSON-encoded `tenancy.ownerReferences` annotation (spec.md §6). The
/// concrete Kubernetes `OwnerReference` schema is out of scope (spec.md §1);
/// this is the minimal shape the annotation contract actually serializes.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// Encodes `refs` as the JSON value stored under `tenancy.ownerReferences`.
pub fn encode_owner_references(refs: &[OwnerReference]) -> String {
    serde_json::to_string(refs).expect("OwnerReference serializes infallibly")
}

/// Marks `obj` as a tenant's root namespace, a GC target for namespace
/// cleanup (spec.md §6).
pub fn mark_vc_root_namespace(obj: &mut SyncedObject) {
    obj.meta
        .annotations
        .insert(ANNOTATION_VC_ROOT_NS.to_string(), "true".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_namespace_name_is_untouched() {
        assert_eq!(super_namespace("c1", "default"), "c1-default");
    }

    #[test]
    fn overlong_namespace_name_is_hashed() {
        let cluster = "c".repeat(120);
        let ns = "n".repeat(200);
        let result = super_namespace(&cluster, &ns);
        assert!(result.len() <= MAX_NAME_LENGTH);
        assert_eq!(result.len(), TRUNCATED_PREFIX_LENGTH + 1 + HASH_SUFFIX_LENGTH);
        let candidate = format!("{cluster}-{ns}");
        assert!(result.starts_with(&candidate[..TRUNCATED_PREFIX_LENGTH]));
    }

    #[test]
    fn build_metadata_sets_tenancy_annotations() {
        let tenant_meta = ObjectMeta {
            name: "web-0".into(),
            namespace: "default".into(),
            uid: "uid-1".into(),
            ..Default::default()
        };
        let super_meta = build_metadata(&tenant_meta, "c1", None);
        assert_eq!(super_meta.namespace, "c1-default");
        assert_eq!(super_meta.annotations[ANNOTATION_CLUSTER], "c1");
        assert_eq!(super_meta.annotations[ANNOTATION_UID], "uid-1");
        assert_eq!(super_meta.annotations[ANNOTATION_NAMESPACE], "default");
    }

    #[test]
    fn build_metadata_carries_encoded_owner_references() {
        let refs = vec![OwnerReference {
            kind: "ReplicaSet".into(),
            name: "web".into(),
            uid: "rs-uid".into(),
        }];
        let tenant_meta = ObjectMeta {
            name: "web-0".into(),
            namespace: "default".into(),
            uid: "uid-1".into(),
            ..Default::default()
        };
        let super_meta = build_metadata(&tenant_meta, "c1", Some(encode_owner_references(&refs)));
        let decoded: Vec<OwnerReferenceDecoded> =
            serde_json::from_str(&super_meta.annotations[ANNOTATION_OWNER_REFERENCES]).unwrap();
        assert_eq!(decoded[0].uid, "rs-uid");
    }

    #[derive(serde::Deserialize)]
    struct OwnerReferenceDecoded {
        uid: String,
    }
}
