//! Error taxonomy for the scheduler cache, resource ledger and syncer engine.
//!
//! Mirrors the error classes of the resource-accounting and reconciliation
//! layers one-to-one: a `LedgerError` can only ever surface wrapped inside a
//! `CacheError`, never on its own, since callers only ever talk to
//! [`crate::core::scheduler_cache::SchedulerCache`].

use thiserror::Error;

/// Errors raised by [`crate::core::ledger::ResourceLedger`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LedgerError {
    #[error("allocation item {0} already exists")]
    Duplicate(String),

    #[error("allocation item {0} not found")]
    NotFound(String),

    #[error("resource key {key} unknown in cluster {cluster}")]
    UnknownResource { cluster: String, key: String },

    #[error("capacity exceeded for resource {key} in cluster {cluster}: {requested} > {capacity}")]
    CapacityExceeded {
        cluster: String,
        key: String,
        requested: i64,
        capacity: i64,
    },

    #[error("slice for {item} claims cluster {claimed}, but is being installed into {actual}")]
    Misplaced {
        item: String,
        claimed: String,
        actual: String,
    },

    #[error("removing item {item} would drive resource {key} negative in cluster {cluster}")]
    Underflow {
        cluster: String,
        item: String,
        key: String,
    },
}

/// Errors raised by [`crate::core::scheduler_cache::SchedulerCache`].
#[derive(Debug, Error, Clone)]
pub enum CacheError {
    #[error("tenant {0} not found")]
    TenantNotFound(String),

    #[error("namespace {0} not found")]
    NamespaceNotFound(String),

    #[error("physical cluster {0} not found")]
    ClusterNotFound(String),

    #[error("pod {0} not found")]
    PodNotFound(String),

    #[error(
        "namespace {namespace} schedule sums to {actual} placements, expected {expected} slices"
    )]
    InconsistentSchedule {
        namespace: String,
        expected: u64,
        actual: u64,
    },

    #[error("cache invariant violated for {namespace}: {reason}; a resync is required")]
    InconsistentCache { namespace: String, reason: String },

    #[error("ledger operation failed for cluster {cluster}: {source}")]
    Ledger {
        cluster: String,
        #[source]
        source: LedgerError,
    },

    #[error(
        "update of {namespace} failed to roll back cleanly: cache no longer holds this namespace \
         and must be resynced from the authoritative source"
    )]
    RollbackFailed { namespace: String },
}

impl CacheError {
    pub fn ledger(cluster: impl Into<String>, source: LedgerError) -> Self {
        CacheError::Ledger {
            cluster: cluster.into(),
            source,
        }
    }
}

/// Errors surfaced by the syncer engine's downward/upward/patrol logic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("object not found")]
    NotFound,

    #[error("object already exists")]
    AlreadyExists,

    #[error("super-side annotation uid does not match tenant uid")]
    UidMismatch,

    #[error("transient error talking to a cluster: {0}")]
    Transient(String),
}

impl SyncError {
    /// `NotFound`/`AlreadyExists` are coerced to success in the directions
    /// the syncer contract calls out (spec.md §4.4, §7); this predicate lets
    /// call sites implement that coercion in one place.
    pub fn is_benign_for_create(&self) -> bool {
        matches!(self, SyncError::AlreadyExists)
    }

    pub fn is_benign_for_delete(&self) -> bool {
        matches!(self, SyncError::NotFound)
    }
}
