//! Physical ("super") cluster: capacity, committed allocation, and the
//! parallel provision ledger reflecting super-side observations
//! (spec.md §3).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::core::common::ResourceList;
use crate::core::ledger::{ResourceLedger, Slice};
use crate::error::LedgerError;

/// Sentinel capacity assigned to a cluster created implicitly by a
/// namespace placement against an unknown cluster name (spec.md §3).
pub fn shadow_sentinel_capacity() -> ResourceList {
    // Deliberately enormous relative to any real quota so a shadow cluster
    // never itself becomes the reason a placement is rejected.
    ["cpu", "mem"]
        .iter()
        .map(|k| (k.to_string(), i64::MAX / 2))
        .collect()
}

#[derive(Debug, Clone)]
pub struct PhysicalCluster {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub capacity: ResourceList,

    alloc_ledger: ResourceLedger,
    provision_ledger: ResourceLedger,

    /// namespace-key -> set of (tenant) pod names scheduled onto this cluster.
    pub pods: HashMap<String, HashSet<String>>,

    pub shadow: bool,
    pub last_update: Instant,
}

impl PhysicalCluster {
    pub fn new(name: String, labels: BTreeMap<String, String>, capacity: ResourceList) -> Self {
        Self {
            alloc_ledger: ResourceLedger::new(&capacity),
            provision_ledger: ResourceLedger::new(&capacity),
            name,
            labels,
            capacity,
            pods: HashMap::new(),
            shadow: false,
            last_update: Instant::now(),
        }
    }

    pub fn new_shadow(name: String) -> Self {
        let capacity = shadow_sentinel_capacity();
        Self {
            alloc_ledger: ResourceLedger::new(&capacity),
            provision_ledger: ResourceLedger::new(&capacity),
            name,
            labels: BTreeMap::new(),
            capacity,
            pods: HashMap::new(),
            shadow: true,
            last_update: Instant::now(),
        }
    }

    pub fn alloc(&self) -> &ResourceList {
        self.alloc_ledger.alloc()
    }

    pub fn provision(&self) -> &ResourceList {
        self.provision_ledger.alloc()
    }

    pub fn alloc_items(&self, namespace_key: &str) -> Option<&[Slice]> {
        self.alloc_ledger.items(namespace_key)
    }

    pub fn alloc_ledger(&self) -> &ResourceLedger {
        &self.alloc_ledger
    }

    pub fn alloc_ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.alloc_ledger
    }

    pub fn provision_ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.provision_ledger
    }

    pub fn add_namespace_slices(
        &mut self,
        namespace_key: &str,
        slices: Vec<Slice>,
    ) -> Result<(), LedgerError> {
        let name = self.name.clone();
        let capacity = self.capacity.clone();
        self.alloc_ledger
            .add_item(&name, &capacity, namespace_key, slices)
    }

    pub fn remove_namespace_slices(&mut self, namespace_key: &str) -> Result<(), LedgerError> {
        let name = self.name.clone();
        self.alloc_ledger.remove_item(&name, namespace_key)
    }

    /// `max(alloc, provision)` entrywise, used as scheduling input
    /// (spec.md §3).
    pub fn effective_alloc(&self) -> ResourceList {
        let mut out = self.alloc_ledger.alloc().clone();
        for (k, v) in self.provision_ledger.alloc() {
            let entry = out.entry(k.clone()).or_insert(0);
            if *v > *entry {
                *entry = *v;
            }
        }
        out
    }

    pub fn touch(&mut self) {
        self.last_update = Instant::now();
    }

    pub fn add_pod(&mut self, namespace_key: &str, pod_name: &str) {
        self.pods
            .entry(namespace_key.to_string())
            .or_default()
            .insert(pod_name.to_string());
    }

    pub fn remove_pod(&mut self, namespace_key: &str, pod_name: &str) {
        if let Some(set) = self.pods.get_mut(namespace_key) {
            set.remove(pod_name);
            if set.is_empty() {
                self.pods.remove(namespace_key);
            }
        }
    }
}
