//! Tenant → super pod mutation rules (spec.md §6).
//!
//! These run after [`crate::syncer::metadata::build_metadata`] has already
//! produced the super-side `ObjectMeta` (name/namespace/tenancy annotations);
//! the functions here rewrite the pod *spec* fields that must differ between
//! the tenant's view of the pod and the one actually scheduled onto the
//! super cluster.

use crate::multicluster::spec::VirtualClusterSpec;
use crate::syncer::metadata::ANNOTATION_CLUSTER;
use crate::syncer::object::{DnsPolicy, DownwardApiField, EnvVar, HostAlias, SyncedObject};

/// A service visible to the pod's namespace (or a tenant master-namespace
/// service), used to synthesize the `{NAME}_SERVICE_HOST`/`_PORT` env vars
/// kubelet normally injects (spec.md §6). The service informer/list plumbing
/// that discovers these is out of scope (spec.md §1); callers supply the
/// resolved list.
#[derive(Debug, Clone)]
pub struct ServiceEnvSource {
    pub name: String,
    pub cluster_ip: String,
    pub port: u16,
}

fn env_var_name(service_name: &str, suffix: &str) -> String {
    format!("{}_SERVICE_{}", service_name.to_uppercase().replace('-', "_"), suffix)
}

/// Injects `{NAME}_SERVICE_HOST`/`{NAME}_SERVICE_PORT` env vars for every
/// service in `services`, unless the pod sets `enableServiceLinks=false`
/// (spec.md §6).
pub fn inject_service_env(pod: &mut SyncedObject, services: &[ServiceEnvSource]) {
    if !pod.body.enable_service_links {
        return;
    }
    for svc in services {
        pod.body.env.push(EnvVar {
            name: env_var_name(&svc.name, "HOST"),
            value: svc.cluster_ip.clone(),
            value_from: None,
        });
        pod.body.env.push(EnvVar {
            name: env_var_name(&svc.name, "PORT"),
            value: svc.port.to_string(),
            value_from: None,
        });
    }
}

/// Replaces `metadata.name|namespace|uid` downward-API env vars with literal
/// tenant values (spec.md §6) — the super pod must report the tenant's
/// identity to the workload, not the super-side renamed one.
pub fn rewrite_downward_env(pod: &mut SyncedObject, tenant_name: &str, tenant_namespace: &str, tenant_uid: &str) {
    for env in &mut pod.body.env {
        let Some(field) = &env.value_from else { continue };
        env.value = match field {
            DownwardApiField::Name => tenant_name.to_string(),
            DownwardApiField::Namespace => tenant_namespace.to_string(),
            DownwardApiField::Uid => tenant_uid.to_string(),
        };
        env.value_from = None;
    }
}

/// Rewrites the tenant SA token volume mount name to the super-side SA
/// secret (spec.md §6). `mapping` is `(tenant_secret_name, super_secret_name)`.
pub fn rewrite_service_account_volume(pod: &mut SyncedObject, tenant_secret_name: &str, super_secret_name: &str) {
    for vm in &mut pod.body.volume_mounts {
        if vm.secret_name == tenant_secret_name {
            vm.secret_name = super_secret_name.to_string();
        }
    }
}

const KUBERNETES_HOST_ALIASES: &[&str] = &["kubernetes", "kubernetes.default", "kubernetes.default.svc"];

/// Adds a `HostAlias` mapping the tenant cluster's DNS service IP to the
/// `kubernetes*` names (spec.md §6), so in-pod clients resolving the
/// apiserver hostname reach the tenant's view rather than the super's.
pub fn add_kubernetes_host_alias(pod: &mut SyncedObject, cluster_dns_ip: &str) {
    pod.body.host_aliases.push(HostAlias {
        ip: cluster_dns_ip.to_string(),
        hostnames: KUBERNETES_HOST_ALIASES.iter().map(|s| s.to_string()).collect(),
    });
}

/// Adds the `tenancy.cluster` label to the pod and to every affinity term's
/// `matchLabels` (spec.md §6), so node/pod affinity scoped by cluster still
/// matches once pods from multiple tenants share the same super cluster.
pub fn add_tenant_cluster_label(pod: &mut SyncedObject, cluster: &str) {
    pod.meta
        .labels
        .insert(ANNOTATION_CLUSTER.to_string(), cluster.to_string());
    for term in &mut pod.body.affinity_match_labels {
        term.insert(ANNOTATION_CLUSTER.to_string(), cluster.to_string());
    }
}

/// Rewrites DNS policy per spec.md §6's table: `ClusterFirst` and
/// `ClusterFirstWithHostNet` become `None` with an explicit `DNSConfig`
/// pointing at the tenant cluster's DNS; `Default` becomes `None` with no
/// config; a pod on the host network falls back to the `Default` case
/// regardless of its declared policy, since a hostNetwork pod cannot
/// meaningfully resolve via the tenant's in-cluster DNS.
pub fn rewrite_dns_policy(pod: &mut SyncedObject, spec: &VirtualClusterSpec) {
    let effective = if pod.body.host_network {
        DnsPolicy::Default
    } else {
        pod.body.dns_policy
    };
    match effective {
        DnsPolicy::ClusterFirst | DnsPolicy::ClusterFirstWithHostNet => {
            pod.body.dns_policy = DnsPolicy::None;
            pod.body.dns_config = Some(crate::syncer::object::PodDnsConfig {
                nameservers: vec![spec.cluster_dns_ip.clone()],
                searches: vec![
                    format!("svc.{}", spec.cluster_domain),
                    spec.cluster_domain.clone(),
                ],
            });
        }
        DnsPolicy::Default => {
            pod.body.dns_policy = DnsPolicy::None;
            pod.body.dns_config = None;
        }
        DnsPolicy::None => {}
    }
}

/// Everything the tenant → super pod mutation rules of spec.md §6 need
/// beyond what [`crate::syncer::metadata::build_metadata`] already fills in.
pub struct PodMutationContext<'a> {
    pub cluster: &'a str,
    pub spec: &'a VirtualClusterSpec,
    pub services: &'a [ServiceEnvSource],
    pub sa_secret_mapping: &'a [(String, String)],
}

/// Applies every spec.md §6 pod mutation rule to `pod` in place. `pod` is
/// expected to already carry the super-side metadata produced by
/// `build_metadata`; `tenant_name`/`tenant_namespace`/`tenant_uid` are the
/// pre-rename tenant identifiers needed for the downward-API env rewrite.
pub fn mutate_pod_for_super(
    pod: &mut SyncedObject,
    tenant_name: &str,
    tenant_namespace: &str,
    tenant_uid: &str,
    ctx: &PodMutationContext,
) {
    inject_service_env(pod, ctx.services);
    rewrite_downward_env(pod, tenant_name, tenant_namespace, tenant_uid);
    for (tenant_secret, super_secret) in ctx.sa_secret_mapping {
        rewrite_service_account_volume(pod, tenant_secret, super_secret);
    }
    add_kubernetes_host_alias(pod, &ctx.spec.cluster_dns_ip);
    add_tenant_cluster_label(pod, ctx.cluster);
    rewrite_dns_policy(pod, ctx.spec);
}
