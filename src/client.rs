//! `SuperClient`/`TenantClient`: the trait boundary standing in for the
//! Kubernetes informer/listener plumbing the spec places out of scope
//! (spec.md §1, §6; SPEC_FULL.md §6). The core never depends on a concrete
//! API client, only on these interfaces.

use crate::error::SyncError;
use crate::multicluster::spec::VirtualClusterSpec;

/// Read access to a single tenant cluster's cache of one resource kind, plus
/// the metadata the equality/mutation rules need.
pub trait TenantClient<T>: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<T>, SyncError>;
    fn list(&self) -> Result<Vec<T>, SyncError>;
    /// Fetches a secondary object type directly from the tenant, bypassing
    /// the informer cache, used for cross-checks (spec.md §4.3).
    fn list_by_object_type(&self, object_type: &str) -> Result<Vec<T>, SyncError>;
    fn spec(&self) -> VirtualClusterSpec;
    /// Writes a tenant-side mirror back (pod status merge, label/annotation
    /// propagation, node heartbeat patch) — the upward half of spec.md §4.4's
    /// `StartUWS`. Not used by the downward reconciler, which only reads.
    fn update_status(&self, namespace: &str, name: &str, obj: T) -> Result<(), SyncError>;
}

/// Read/write access to the super cluster's view of one resource kind.
pub trait SuperClient<T>: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Result<Option<T>, SyncError>;
    fn list(&self) -> Result<Vec<T>, SyncError>;
    fn create(&self, obj: T) -> Result<(), SyncError>;
    fn update(&self, obj: T) -> Result<(), SyncError>;
    /// Deletes with `Background` propagation and a UID precondition: the
    /// delete must be refused if `uid_precondition` disagrees with the
    /// object currently stored under `(namespace, name)` (spec.md §4.4).
    fn delete(&self, namespace: &str, name: &str, uid_precondition: &str) -> Result<(), SyncError>;
}
