//! Pod `ResourceSyncer` (spec.md §4.4, §6): the fully wired reference kind
//! exercising all four `Reconcile` cases, `StartUWS`, and `StartPatrol`.

use std::collections::BTreeMap;

use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::metadata::build_metadata;
use crate::syncer::mutation::{mutate_pod_for_super, PodMutationContext, ServiceEnvSource};
use crate::syncer::object::{PodCondition, SyncedObject};
use crate::syncer::ResourceSyncer;

/// Services visible in the pod's namespace plus the tenant master-namespace
/// services, and the tenant→super service-account secret mapping — fixed
/// per tenant cluster and supplied at construction, since discovering them
/// live is the service/SA informer plumbing spec.md §1 places out of scope.
pub struct PodSyncer {
    services: Vec<ServiceEnvSource>,
    sa_secret_mapping: Vec<(String, String)>,
}

impl PodSyncer {
    pub fn new(services: Vec<ServiceEnvSource>, sa_secret_mapping: Vec<(String, String)>) -> Self {
        Self {
            services,
            sa_secret_mapping,
        }
    }
}

impl ResourceSyncer for PodSyncer {
    fn kind(&self) -> &'static str {
        "Pod"
    }

    fn build_super_object(&self, tenant: &SyncedObject, cluster: &str, spec: &VirtualClusterSpec) -> SyncedObject {
        let mut built = tenant.clone();
        built.meta = build_metadata(&tenant.meta, cluster, None);
        let ctx = PodMutationContext {
            cluster,
            spec,
            services: &self.services,
            sa_secret_mapping: &self.sa_secret_mapping,
        };
        mutate_pod_for_super(&mut built, &tenant.meta.name, &tenant.meta.namespace, &tenant.meta.uid, &ctx);
        built
    }

    fn apply_uws(
        &self,
        tenant_obj: &SyncedObject,
        super_obj: &SyncedObject,
        spec: &VirtualClusterSpec,
    ) -> Option<SyncedObject> {
        let mut patched = tenant_obj.clone();
        let mut changed = false;

        let merged_conditions = merge_readiness_gated_conditions(
            &tenant_obj.body.conditions,
            &super_obj.body.conditions,
            &tenant_obj.body.readiness_gates,
        );
        if merged_conditions != tenant_obj.body.conditions {
            patched.body.conditions = merged_conditions;
            changed = true;
        }

        if patched.body.phase != super_obj.body.phase {
            patched.body.phase = super_obj.body.phase.clone();
            changed = true;
        }
        if patched.body.node_name != super_obj.body.node_name {
            patched.body.node_name = super_obj.body.node_name.clone();
            changed = true;
        }

        for (key, value) in &super_obj.meta.annotations {
            if spec.is_transparent(key) && tenant_obj.meta.annotations.get(key) != Some(value) {
                patched.meta.annotations.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        for (key, value) in &super_obj.meta.labels {
            if spec.is_transparent(key) && tenant_obj.meta.labels.get(key) != Some(value) {
                patched.meta.labels.insert(key.clone(), value.clone());
                changed = true;
            }
        }

        changed.then_some(patched)
    }
}

/// Merges super pod status conditions into the tenant pod's view: types
/// listed in the tenant's readiness gates keep the tenant's own report,
/// every other condition type mirrors super (spec.md §4.4, §6).
pub fn merge_readiness_gated_conditions(
    tenant_conditions: &[PodCondition],
    super_conditions: &[PodCondition],
    readiness_gates: &[String],
) -> Vec<PodCondition> {
    let mut merged: BTreeMap<String, PodCondition> = super_conditions
        .iter()
        .map(|c| (c.condition_type.clone(), c.clone()))
        .collect();
    for c in tenant_conditions {
        if readiness_gates.iter().any(|g| g == &c.condition_type) {
            merged.insert(c.condition_type.clone(), c.clone());
        }
    }
    let mut out: Vec<PodCondition> = merged.into_values().collect();
    out.sort_by(|a, b| a.condition_type.cmp(&b.condition_type));
    out
}

/// Whether an evicted tenant pod (super mirror gone) is force-deleted
/// gracefully or immediately, per the "Pod in super" state machine (spec.md
/// §4.4): graceful if it was never scheduled, immediate once it was. Wiring
/// the actual tenant-side delete call is outside this crate's read-only
/// `TenantClient` surface (spec.md §1); this is the pure decision the
/// engine would act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictedPodDeleteMode {
    Graceful,
    Immediate,
}

pub fn evicted_pod_delete_mode(tenant_pod: &SyncedObject) -> EvictedPodDeleteMode {
    if tenant_pod.is_assigned() {
        EvictedPodDeleteMode::Immediate
    } else {
        EvictedPodDeleteMode::Graceful
    }
}

/// True once both pods' `nodeName`s are set and disagree — an
/// irrecoverable inconsistency at this layer that spec.md §4.4 resolves by
/// deleting the tenant pod.
pub fn node_name_inconsistent(super_pod: &SyncedObject, tenant_pod: &SyncedObject) -> bool {
    match (&super_pod.body.node_name, &tenant_pod.body.node_name) {
        (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => s != t,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncer::object::ObjectMeta;

    fn pod(node_name: Option<&str>) -> SyncedObject {
        SyncedObject {
            meta: ObjectMeta::default(),
            body: crate::syncer::object::ObjectBody {
                node_name: node_name.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn readiness_gated_condition_keeps_tenant_report() {
        let tenant = vec![PodCondition {
            condition_type: "my.readiness/gate".into(),
            status: "True".into(),
        }];
        let zuper = vec![
            PodCondition {
                condition_type: "my.readiness/gate".into(),
                status: "False".into(),
            },
            PodCondition {
                condition_type: "Ready".into(),
                status: "True".into(),
            },
        ];
        let merged = merge_readiness_gated_conditions(&tenant, &zuper, &["my.readiness/gate".to_string()]);
        let gate = merged.iter().find(|c| c.condition_type == "my.readiness/gate").unwrap();
        assert_eq!(gate.status, "True");
        let ready = merged.iter().find(|c| c.condition_type == "Ready").unwrap();
        assert_eq!(ready.status, "True");
    }

    #[test]
    fn evicted_unscheduled_pod_deletes_gracefully() {
        assert_eq!(evicted_pod_delete_mode(&pod(None)), EvictedPodDeleteMode::Graceful);
    }

    #[test]
    fn evicted_scheduled_pod_deletes_immediately() {
        assert_eq!(evicted_pod_delete_mode(&pod(Some("node-1"))), EvictedPodDeleteMode::Immediate);
    }

    #[test]
    fn disagreeing_node_names_flagged_inconsistent() {
        assert!(node_name_inconsistent(&pod(Some("node-1")), &pod(Some("node-2"))));
        assert!(!node_name_inconsistent(&pod(Some("node-1")), &pod(Some("node-1"))));
        assert!(!node_name_inconsistent(&pod(None), &pod(Some("node-1"))));
    }
}
