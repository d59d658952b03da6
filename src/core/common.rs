//! Shared primitive types used across the cache, ledger and syncer.

use std::collections::BTreeMap;

/// A resource quantity map, e.g. `{"cpu": 2000, "mem": 4294967296}`.
///
/// Units are caller-defined (millicores, bytes, ...); the cache only ever
/// adds, subtracts and compares entries keyed by the same resource name.
pub type ResourceList = BTreeMap<String, i64>;

/// `ceil(a / b)` for strictly positive `b`.
pub fn ceil_div(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0, "quotaSlice divisor must be non-zero");
    (a + b - 1) / b
}

/// Adds `count` copies of `unit` into `acc`, entrywise.
pub fn add_scaled(acc: &mut ResourceList, unit: &ResourceList, count: i64) {
    for (k, v) in unit {
        *acc.entry(k.clone()).or_insert(0) += v * count;
    }
}

/// Key of a tenant namespace: `owner/name`.
pub fn namespace_key(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

/// Key of a tenant pod under the uid-based convention (see DESIGN.md):
/// `owner/namespace/uid`.
pub fn pod_key(owner: &str, namespace: &str, uid: &str) -> String {
    format!("{owner}/{namespace}/{uid}")
}
