//! Resource ledger: the `(alloc, allocItems)` accounting pair of a single
//! physical cluster (spec.md §4.1). The same type backs both the downward
//! `alloc`/`allocItems` ledger and the upward `provision`/`provisionItems`
//! ledger of [`crate::core::cluster::PhysicalCluster`].

use std::collections::BTreeMap;

use crate::core::common::ResourceList;
use crate::error::LedgerError;

/// An indivisible allocation unit carved out of a namespace's quota
/// (spec.md §3, "Slice").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Namespace key (`owner/name`) this slice belongs to.
    pub owner: String,
    pub size: ResourceList,
    pub cluster: String,
}

/// Tracks committed allocation against capacity for one physical cluster.
///
/// Invariant (spec.md §3): for every resource key `k`,
/// `0 <= alloc[k] <= capacity[k]`, and `alloc[k]` equals the sum of
/// `size[k]` over every slice list in `items`.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    alloc: ResourceList,
    items: BTreeMap<String, Vec<Slice>>,
}

impl ResourceLedger {
    pub fn new(capacity_keys: &ResourceList) -> Self {
        let alloc = capacity_keys.keys().map(|k| (k.clone(), 0)).collect();
        Self {
            alloc,
            items: BTreeMap::new(),
        }
    }

    pub fn alloc(&self) -> &ResourceList {
        &self.alloc
    }

    pub fn items(&self, key: &str) -> Option<&[Slice]> {
        self.items.get(key).map(Vec::as_slice)
    }

    pub fn all_items(&self) -> &BTreeMap<String, Vec<Slice>> {
        &self.items
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Adds `slices` under `key`, all-or-nothing against `capacity` and the
    /// owning cluster's `cluster_name`. On any failure the ledger is left
    /// byte-identical to its pre-call state (spec.md §4.1, §8 invariant 4).
    pub fn add_item(
        &mut self,
        cluster_name: &str,
        capacity: &ResourceList,
        key: &str,
        slices: Vec<Slice>,
    ) -> Result<(), LedgerError> {
        if self.items.contains_key(key) {
            return Err(LedgerError::Duplicate(key.to_string()));
        }

        let mut scratch = self.alloc.clone();
        for slice in &slices {
            if slice.cluster != cluster_name {
                return Err(LedgerError::Misplaced {
                    item: key.to_string(),
                    claimed: slice.cluster.clone(),
                    actual: cluster_name.to_string(),
                });
            }
            for (res_key, qty) in &slice.size {
                let cap = capacity.get(res_key).copied().ok_or_else(|| {
                    LedgerError::UnknownResource {
                        cluster: cluster_name.to_string(),
                        key: res_key.clone(),
                    }
                })?;
                let entry = scratch.get_mut(res_key).ok_or_else(|| {
                    LedgerError::UnknownResource {
                        cluster: cluster_name.to_string(),
                        key: res_key.clone(),
                    }
                })?;
                *entry += qty;
                if *entry > cap {
                    return Err(LedgerError::CapacityExceeded {
                        cluster: cluster_name.to_string(),
                        key: res_key.clone(),
                        requested: *entry,
                        capacity: cap,
                    });
                }
            }
        }

        self.alloc = scratch;
        self.items.insert(key.to_string(), slices);
        Ok(())
    }

    /// Removes the slices under `key`, subtracting their sizes from `alloc`.
    /// Fails with [`LedgerError::Underflow`] if any resource would go
    /// negative, which indicates cache corruption rather than a normal
    /// caller error (spec.md §4.1).
    pub fn remove_item(&mut self, cluster_name: &str, key: &str) -> Result<(), LedgerError> {
        let slices = self
            .items
            .get(key)
            .ok_or_else(|| LedgerError::NotFound(key.to_string()))?;

        let mut scratch = self.alloc.clone();
        for slice in slices {
            for (res_key, qty) in &slice.size {
                let entry = scratch
                    .get_mut(res_key)
                    .ok_or_else(|| LedgerError::UnknownResource {
                        cluster: cluster_name.to_string(),
                        key: res_key.clone(),
                    })?;
                *entry -= qty;
                if *entry < 0 {
                    return Err(LedgerError::Underflow {
                        cluster: cluster_name.to_string(),
                        item: key.to_string(),
                        key: res_key.clone(),
                    });
                }
            }
        }

        self.alloc = scratch;
        self.items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(pairs: &[(&str, i64)]) -> ResourceList {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn add_item_commits_on_success() {
        let capacity = cap(&[("cpu", 2000), ("mem", 4096)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("cpu", 500), ("mem", 1024)]),
            cluster: "c1".into(),
        };
        ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap();
        assert_eq!(ledger.alloc()["cpu"], 500);
        assert_eq!(ledger.alloc()["mem"], 1024);
        assert!(ledger.contains("t/ns"));
    }

    #[test]
    fn add_item_duplicate_key_rejected() {
        let capacity = cap(&[("cpu", 2000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("cpu", 500)]),
            cluster: "c1".into(),
        };
        ledger
            .add_item("c1", &capacity, "t/ns", vec![slice.clone()])
            .unwrap();
        let err = ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap_err();
        assert_eq!(err, LedgerError::Duplicate("t/ns".into()));
    }

    #[test]
    fn add_item_capacity_exceeded_rolls_back() {
        let capacity = cap(&[("cpu", 1000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let before = ledger.alloc().clone();
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("cpu", 1500)]),
            cluster: "c1".into(),
        };
        let err = ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap_err();
        assert!(matches!(err, LedgerError::CapacityExceeded { .. }));
        assert_eq!(&before, ledger.alloc());
        assert!(!ledger.contains("t/ns"));
    }

    #[test]
    fn add_item_unknown_resource_rejected() {
        let capacity = cap(&[("cpu", 1000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("mem", 100)]),
            cluster: "c1".into(),
        };
        let err = ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownResource { .. }));
    }

    #[test]
    fn add_item_misplaced_slice_rejected() {
        let capacity = cap(&[("cpu", 1000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("cpu", 100)]),
            cluster: "other-cluster".into(),
        };
        let err = ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Misplaced { .. }));
    }

    #[test]
    fn remove_item_restores_alloc() {
        let capacity = cap(&[("cpu", 1000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let slice = Slice {
            owner: "t/ns".into(),
            size: cap(&[("cpu", 500)]),
            cluster: "c1".into(),
        };
        ledger
            .add_item("c1", &capacity, "t/ns", vec![slice])
            .unwrap();
        ledger.remove_item("c1", "t/ns").unwrap();
        assert_eq!(ledger.alloc()["cpu"], 0);
        assert!(!ledger.contains("t/ns"));
    }

    #[test]
    fn remove_item_not_found() {
        let capacity = cap(&[("cpu", 1000)]);
        let mut ledger = ResourceLedger::new(&capacity);
        let err = ledger.remove_item("c1", "missing").unwrap_err();
        assert_eq!(err, LedgerError::NotFound("missing".into()));
    }
}
