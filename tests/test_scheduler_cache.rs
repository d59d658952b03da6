//! Integration tests for the scheduler cache scenarios of spec.md §8
//! (S1-S5), exercised through the public `SchedulerCache`/`Scheduler` API
//! the way the teacher's `tests/test_scheduler.rs` drives `Scheduler`.

use vcluster_scheduler_core::core::scheduler_cache::SchedulerCache;
use vcluster_scheduler_core::error::{CacheError, LedgerError};
use vcluster_scheduler_core::test_util::{namespace, pod, resources};

fn cache_with_clusters(clusters: &[(&str, &[(&str, i64)])]) -> SchedulerCache {
    let cache = SchedulerCache::default();
    for (name, cap) in clusters {
        cache.add_cluster(name, Default::default(), resources(cap));
    }
    cache
}

/// S1 - multi-cluster placement succeeds.
#[test]
fn s1_multi_cluster_placement_succeeds() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)]), ("c2", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace(
        "t",
        "n",
        &[("cpu", 1000), ("mem", 2048)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 1), ("c2", 1)],
    );
    cache.add_namespace(&ns).unwrap();

    let c1 = cache.get_cluster("c1").unwrap();
    let c2 = cache.get_cluster("c2").unwrap();
    assert_eq!(c1.alloc()["cpu"], 500);
    assert_eq!(c1.alloc()["mem"], 1024);
    assert_eq!(c2.alloc()["cpu"], 500);
    assert_eq!(c2.alloc()["mem"], 1024);
}

/// S2 - insufficient placements are rejected before any ledger touch.
#[test]
fn s2_insufficient_placements_rejected() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)]), ("c2", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace(
        "t",
        "n",
        &[("cpu", 1000), ("mem", 2048)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 1)],
    );
    let err = cache.add_namespace(&ns).unwrap_err();
    assert!(matches!(err, CacheError::InconsistentSchedule { expected: 2, actual: 1, .. }));

    let c1 = cache.get_cluster("c1").unwrap();
    let c2 = cache.get_cluster("c2").unwrap();
    assert_eq!(c1.alloc()["cpu"], 0);
    assert_eq!(c2.alloc()["cpu"], 0);
}

/// S3 - a capacity-exceeding slice on one cluster rolls back every
/// placement already committed on the others.
#[test]
fn s3_capacity_exceeded_rolls_back_all_clusters() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 4000), ("mem", 8192)]), ("c2", &[("cpu", 4000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace(
        "t",
        "n",
        &[("cpu", 4000), ("mem", 8192)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 2), ("c2", 6)],
    );
    let err = cache.add_namespace(&ns).unwrap_err();
    assert!(matches!(
        err,
        CacheError::Ledger { source: LedgerError::CapacityExceeded { .. }, .. }
    ));

    let c1 = cache.get_cluster("c1").unwrap();
    let c2 = cache.get_cluster("c2").unwrap();
    assert_eq!(c1.alloc()["cpu"], 0);
    assert_eq!(c1.alloc()["mem"], 0);
    assert_eq!(c2.alloc()["cpu"], 0);
    assert_eq!(c2.alloc()["mem"], 0);
}

/// S4 - a placement against an unknown cluster creates a shadow cluster
/// which a later `AddCluster` absorbs, clearing the shadow flag while
/// preserving the alloc already committed against it.
#[test]
fn s4_shadow_cluster_created_then_absorbed() {
    let cache = SchedulerCache::default();
    cache.add_tenant("t");
    let ns = namespace(
        "t",
        "n",
        &[("cpu", 500), ("mem", 1024)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("shadow", 1)],
    );
    cache.add_namespace(&ns).unwrap();

    let shadow = cache.get_cluster("shadow").unwrap();
    assert!(shadow.shadow);
    assert_eq!(shadow.alloc()["cpu"], 500);
    assert_eq!(shadow.alloc()["mem"], 1024);

    cache.add_cluster("shadow", Default::default(), resources(&[("cpu", 4000), ("mem", 8192)]));
    let absorbed = cache.get_cluster("shadow").unwrap();
    assert!(!absorbed.shadow);
    assert_eq!(absorbed.capacity["cpu"], 4000);
    assert_eq!(absorbed.alloc()["cpu"], 500);
    assert_eq!(absorbed.alloc()["mem"], 1024);
}

/// S5 - re-binding a pod to a different cluster moves it out of the old
/// cluster's pod index and into the new one, and updates the global index.
#[test]
fn s5_pod_rebinding_updates_cluster_index() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)]), ("c2", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace(
        "t",
        "n",
        &[("cpu", 1000), ("mem", 2048)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 1), ("c2", 1)],
    );
    cache.add_namespace(&ns).unwrap();

    let p = pod("t", "n", "web-0", "uid-1", &[("cpu", 100)], "c1");
    cache.add_pod(&p).unwrap();
    assert!(cache.get_cluster("c1").unwrap().pods["t/n"].contains("web-0"));

    let moved = pod("t", "n", "web-0", "uid-1", &[("cpu", 100)], "c2");
    cache.add_pod(&moved).unwrap();

    assert!(!cache.get_cluster("c1").unwrap().pods.get("t/n").map(|s| s.contains("web-0")).unwrap_or(false));
    assert!(cache.get_cluster("c2").unwrap().pods["t/n"].contains("web-0"));
    assert_eq!(cache.get_pod(&moved.key()).unwrap().cluster, "c2");
}

/// Invariant 4 (spec.md §8): a failed `AddNamespace` leaves the cache
/// byte-identical to its pre-call state.
#[test]
fn add_namespace_failure_leaves_cache_unchanged() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 1000), ("mem", 2048)])]);
    cache.add_tenant("t");
    let before = cache.dump();

    let ns = namespace(
        "t",
        "n",
        &[("cpu", 2000), ("mem", 2048)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 4)],
    );
    assert!(cache.add_namespace(&ns).is_err());
    assert_eq!(cache.dump(), before);
}

/// Invariant 5 (spec.md §8): `RemoveTenant` either removes the tenant and
/// every namespace it owns, or leaves the cache unchanged.
#[test]
fn remove_tenant_removes_every_owned_namespace() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    for n in ["a", "b"] {
        let ns = namespace("t", n, &[("cpu", 500), ("mem", 1024)], &[("cpu", 500), ("mem", 1024)], vec![("c1", 1)]);
        cache.add_namespace(&ns).unwrap();
    }

    cache.remove_tenant("t").unwrap();
    assert!(!cache.has_tenant("t"));
    assert!(cache.get_namespace("t/a").is_none());
    assert!(cache.get_namespace("t/b").is_none());
    assert_eq!(cache.get_cluster("c1").unwrap().alloc()["cpu"], 0);
}

/// A namespace belonging to an unregistered tenant is silently skipped
/// (spec.md §9 design note).
#[test]
fn add_namespace_silently_skipped_for_unknown_tenant() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)])]);
    let ns = namespace("ghost", "n", &[("cpu", 500), ("mem", 1024)], &[("cpu", 500), ("mem", 1024)], vec![("c1", 1)]);
    assert!(cache.add_namespace(&ns).is_ok());
    assert!(cache.get_namespace("ghost/n").is_none());
    assert_eq!(cache.get_cluster("c1").unwrap().alloc()["cpu"], 0);
}

/// `SnapshotForNamespaceSched` excludes shadow clusters and subtracts the
/// removed namespace's slices from the surviving snapshot.
#[test]
fn snapshot_for_namespace_sched_subtracts_removed_namespace() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace("t", "n", &[("cpu", 500), ("mem", 1024)], &[("cpu", 500), ("mem", 1024)], vec![("c1", 1)]);
    cache.add_namespace(&ns).unwrap();
    // Force a shadow cluster into existence to verify it is excluded.
    let shadow_ns = namespace("t", "m", &[("cpu", 500), ("mem", 1024)], &[("cpu", 500), ("mem", 1024)], vec![("shadow", 1)]);
    cache.add_namespace(&shadow_ns).unwrap();

    let snapshot = cache.snapshot_for_namespace_sched(std::slice::from_ref(&ns)).unwrap();
    assert!(!snapshot.contains_key("shadow"));
    assert_eq!(snapshot["c1"].alloc["cpu"], 0);
    assert_eq!(snapshot["c1"].alloc["mem"], 0);
}

/// `SnapshotForPodSched` sums sibling pod requests already bound to each
/// placement, excluding the pod being (re)scheduled.
#[test]
fn snapshot_for_pod_sched_sums_sibling_requests() {
    let cache = cache_with_clusters(&[("c1", &[("cpu", 2000), ("mem", 4096)])]);
    cache.add_tenant("t");
    let ns = namespace("t", "n", &[("cpu", 1000), ("mem", 2048)], &[("cpu", 500), ("mem", 1024)], vec![("c1", 2)]);
    cache.add_namespace(&ns).unwrap();

    let sibling = pod("t", "n", "sibling", "uid-sibling", &[("cpu", 100)], "c1");
    cache.add_pod(&sibling).unwrap();
    let target = pod("t", "n", "target", "uid-target", &[("cpu", 50)], "c1");
    cache.add_pod(&target).unwrap();

    let snapshot = cache.snapshot_for_pod_sched(&target).unwrap();
    assert_eq!(snapshot["c1"].capacity["cpu"], 1000);
    assert_eq!(snapshot["c1"].alloc["cpu"], 100);
}
