//! Generic object envelope the syncer engine reconciles.
//!
//! The concrete Kubernetes API object schemas are explicitly out of scope
//! (spec.md §1); `SyncedObject` carries exactly the fields the equality and
//! mutation rules of spec.md §4.4/§6 operate on, abstracted over "kind" via
//! [`ObjectBody`].

use std::collections::BTreeMap;

use crate::multicluster::TenantObject;
use crate::syncer::metadata::{ANNOTATION_CLUSTER, ANNOTATION_NAMESPACE, ANNOTATION_UID};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    pub uid: String,
    pub generate_name: Option<String>,
    pub cluster_name: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn tenancy_uid(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_UID).map(String::as_str)
    }

    pub fn tenancy_cluster(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_CLUSTER).map(String::as_str)
    }

    pub fn tenancy_namespace(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_NAMESPACE).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSubset {
    pub target_ref_namespace: String,
    pub target_ref_name: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodCondition {
    pub condition_type: String,
    pub status: String,
}

/// A downward-API source for an env var (spec.md §6: "Replace downward-API
/// envs (`metadata.name|namespace|uid`) with literal tenant values").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownwardApiField {
    Name,
    Namespace,
    Uid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
    pub value_from: Option<DownwardApiField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub name: String,
    pub secret_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DnsPolicy {
    #[default]
    ClusterFirst,
    ClusterFirstWithHostNet,
    Default,
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodDnsConfig {
    pub nameservers: Vec<String>,
    pub searches: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostAlias {
    pub ip: String,
    pub hostnames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBody {
    pub containers: Vec<ContainerSpec>,
    pub active_deadline_seconds: Option<i64>,
    pub data: BTreeMap<String, Vec<u8>>,
    pub subsets: Vec<EndpointSubset>,
    pub node_name: Option<String>,
    pub conditions: Vec<PodCondition>,
    pub readiness_gates: Vec<String>,
    pub phase: Option<String>,

    /// Pod mutation fields (spec.md §6); unused by non-pod kinds.
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
    /// One entry per affinity term's `matchLabels` map.
    pub affinity_match_labels: Vec<BTreeMap<String, String>>,
    pub dns_policy: DnsPolicy,
    pub dns_config: Option<PodDnsConfig>,
    pub host_aliases: Vec<HostAlias>,
    pub enable_service_links: bool,
    pub host_network: bool,
}

impl Default for ObjectBody {
    fn default() -> Self {
        Self {
            containers: Vec::new(),
            active_deadline_seconds: None,
            data: BTreeMap::new(),
            subsets: Vec::new(),
            node_name: None,
            conditions: Vec::new(),
            readiness_gates: Vec::new(),
            phase: None,
            env: Vec::new(),
            volume_mounts: Vec::new(),
            affinity_match_labels: Vec::new(),
            dns_policy: DnsPolicy::default(),
            dns_config: None,
            host_aliases: Vec::new(),
            // Kubernetes defaults `enableServiceLinks` to true.
            enable_service_links: true,
            host_network: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncedObject {
    pub meta: ObjectMeta,
    pub body: ObjectBody,
}

impl SyncedObject {
    /// A pod is "assigned" once its node name is set (spec.md §4.4).
    pub fn is_assigned(&self) -> bool {
        self.body
            .node_name
            .as_ref()
            .map(|n| !n.is_empty())
            .unwrap_or(false)
    }
}

impl TenantObject for SyncedObject {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    fn uid(&self) -> &str {
        &self.meta.uid
    }
}
