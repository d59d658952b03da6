//! Tenant namespace and its multi-cluster schedule (spec.md §3).

use std::collections::BTreeMap;

use crate::core::common::{ceil_div, namespace_key, ResourceList};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub cluster: String,
    pub num: u32,
}

#[derive(Debug, Clone)]
pub struct Namespace {
    pub owner: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub quota: ResourceList,
    pub quota_slice: ResourceList,
    pub schedule: Vec<Placement>,
}

impl Namespace {
    pub fn key(&self) -> String {
        namespace_key(&self.owner, &self.name)
    }

    /// `ceil(quota[k] / quotaSlice[k])` maximized over every key `k` present
    /// in `quotaSlice` (spec.md §3).
    ///
    /// Returns `None` if `quotaSlice` names a key absent from `quota`, or a
    /// zero divisor for a key — both render the namespace inadmissible.
    pub fn slice_count(&self) -> Option<u64> {
        let mut max = 0u64;
        for (k, divisor) in &self.quota_slice {
            if *divisor == 0 {
                return None;
            }
            let total = *self.quota.get(k)?;
            max = max.max(ceil_div(total, *divisor) as u64);
        }
        Some(max)
    }

    /// A namespace is admissible iff every key in `quotaSlice` is present in
    /// `quota` (with a non-zero divisor) and the schedule's placement counts
    /// sum to exactly `slice_count()` (spec.md §3).
    pub fn is_admissible(&self) -> bool {
        match self.slice_count() {
            Some(expected) => {
                let actual: u64 = self.schedule.iter().map(|p| p.num as u64).sum();
                actual == expected
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns(quota: &[(&str, i64)], slice: &[(&str, i64)], schedule: Vec<Placement>) -> Namespace {
        Namespace {
            owner: "t".into(),
            name: "n".into(),
            labels: BTreeMap::new(),
            quota: quota.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            quota_slice: slice.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            schedule,
        }
    }

    #[test]
    fn slice_count_maximizes_over_keys() {
        let namespace = ns(
            &[("cpu", 1000), ("mem", 2048)],
            &[("cpu", 500), ("mem", 1024)],
            vec![],
        );
        assert_eq!(namespace.slice_count(), Some(2));
    }

    #[test]
    fn slice_count_none_when_key_missing_from_quota() {
        let namespace = ns(&[("cpu", 1000)], &[("mem", 512)], vec![]);
        assert_eq!(namespace.slice_count(), None);
    }

    #[test]
    fn admissible_requires_exact_placement_sum() {
        let namespace = ns(
            &[("cpu", 1000), ("mem", 2048)],
            &[("cpu", 500), ("mem", 1024)],
            vec![
                Placement {
                    cluster: "c1".into(),
                    num: 1,
                },
                Placement {
                    cluster: "c2".into(),
                    num: 1,
                },
            ],
        );
        assert!(namespace.is_admissible());
    }

    #[test]
    fn inadmissible_when_placement_sum_mismatches() {
        let namespace = ns(
            &[("cpu", 1000), ("mem", 2048)],
            &[("cpu", 500), ("mem", 1024)],
            vec![Placement {
                cluster: "c1".into(),
                num: 1,
            }],
        );
        assert!(!namespace.is_admissible());
    }
}
