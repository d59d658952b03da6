//! Rate-limited, per-key work queue backing [`crate::multicluster::controller::MultiClusterController`]
//! (spec.md §4.3).
//!
//! Generalizes the teacher's `scheduler/queue.rs` `BinaryHeap<QueuedPodInfo>`
//! pattern (earliest-ready-time-first ordering, a timestamp-keyed retry
//! horizon) from "pod ready to (re)schedule" to "reconcile request ready to
//! run after backoff". Requests for the same key coalesce: a second `Add`
//! for a key already queued is dropped, matching client-go's workqueue
//! semantics of "at most one pending generation per key".

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// The three event kinds a tenant-side informer can report (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Add,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub cluster: String,
    pub namespace: String,
    pub name: String,
    pub event: EventKind,
}

impl ReconcileRequest {
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.cluster, self.namespace, self.name)
    }
}

struct WorkItem {
    ready_at: Instant,
    attempts: u32,
    request: ReconcileRequest,
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.request == other.request
    }
}
impl Eq for WorkItem {}

impl Ord for WorkItem {
    // `BinaryHeap` is a max-heap; reverse so the earliest `ready_at` sorts first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.ready_at.cmp(&self.ready_at)
    }
}
impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(5);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

struct Inner {
    heap: BinaryHeap<WorkItem>,
    queued_keys: HashSet<String>,
    processing_keys: HashSet<String>,
    stopped: bool,
}

/// A bounded, per-key-serialized, rate-limited queue of reconcile requests.
pub struct WorkQueue {
    inner: Mutex<Inner>,
    cvar: Condvar,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

impl WorkQueue {
    pub fn new(base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                queued_keys: HashSet::new(),
                processing_keys: HashSet::new(),
                stopped: false,
            }),
            cvar: Condvar::new(),
            base_backoff,
            max_backoff,
        }
    }

    /// Enqueues `request` for immediate processing, coalescing with any
    /// already-pending request for the same key.
    pub fn add(&self, request: ReconcileRequest) {
        let key = request.key();
        let mut inner = self.inner.lock().unwrap();
        if inner.queued_keys.contains(&key) {
            return;
        }
        inner.queued_keys.insert(key);
        inner.heap.push(WorkItem {
            ready_at: Instant::now(),
            attempts: 0,
            request,
        });
        self.cvar.notify_all();
    }

    /// Re-enqueues `request` after an exponential backoff computed from
    /// `attempts` (spec.md §4.3: "Failed reconciles return a Requeue flag
    /// that triggers exponential backoff by the work queue").
    pub fn add_rate_limited(&self, request: ReconcileRequest, attempts: u32) {
        let key = request.key();
        let delay = self
            .base_backoff
            .checked_mul(1u32.checked_shl(attempts.min(20)).unwrap_or(u32::MAX))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);
        let mut inner = self.inner.lock().unwrap();
        if inner.queued_keys.contains(&key) {
            return;
        }
        inner.queued_keys.insert(key);
        inner.heap.push(WorkItem {
            ready_at: Instant::now() + delay,
            attempts,
            request,
        });
        self.cvar.notify_all();
    }

    /// Blocks until an item is both ready (`ready_at <= now`) and not
    /// already being processed by another worker (per-key serialization,
    /// spec.md §4.3: "events per (cluster, key) are processed serially"),
    /// or the queue is stopped.
    pub fn get(&self) -> Option<(ReconcileRequest, u32)> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.stopped {
                return None;
            }

            let now = Instant::now();
            let mut candidate_ready = None;
            let mut deferred = Vec::new();
            while let Some(item) = inner.heap.peek() {
                if item.ready_at > now {
                    break;
                }
                let item = inner.heap.pop().unwrap();
                if inner.processing_keys.contains(&item.request.key()) {
                    deferred.push(item);
                    continue;
                }
                candidate_ready = Some(item);
                break;
            }
            for item in deferred {
                inner.heap.push(item);
            }

            if let Some(item) = candidate_ready {
                let key = item.request.key();
                inner.queued_keys.remove(&key);
                inner.processing_keys.insert(key);
                return Some((item.request, item.attempts));
            }

            let wait_for = inner
                .heap
                .peek()
                .map(|item| item.ready_at.saturating_duration_since(now))
                .unwrap_or(Duration::from_secs(1));
            let (guard, _) = self.cvar.wait_timeout(inner, wait_for).unwrap();
            inner = guard;
        }
    }

    /// Marks `key` no longer in flight, allowing a pending item for the
    /// same key to be picked up by the next `get()`.
    pub fn done(&self, request: &ReconcileRequest) {
        let mut inner = self.inner.lock().unwrap();
        inner.processing_keys.remove(&request.key());
        self.cvar.notify_all();
    }

    /// Drops every pending request for `cluster` (spec.md §4.3,
    /// `TeardownClusterResource`).
    pub fn drop_cluster(&self, cluster: &str) {
        let mut inner = self.inner.lock().unwrap();
        let retained: BinaryHeap<WorkItem> = inner
            .heap
            .drain()
            .filter(|item| {
                let keep = item.request.cluster != cluster;
                if !keep {
                    inner.queued_keys.remove(&item.request.key());
                }
                keep
            })
            .collect();
        inner.heap = retained;
    }

    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stopped = true;
        self.cvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(cluster: &str, name: &str) -> ReconcileRequest {
        ReconcileRequest {
            cluster: cluster.to_string(),
            namespace: "ns".to_string(),
            name: name.to_string(),
            event: EventKind::Add,
        }
    }

    #[test]
    fn fifo_ordering_for_immediately_ready_items() {
        let queue = WorkQueue::default();
        queue.add(req("c1", "a"));
        queue.add(req("c1", "b"));
        let (first, _) = queue.get().unwrap();
        assert_eq!(first.name, "a");
        queue.done(&first);
        let (second, _) = queue.get().unwrap();
        assert_eq!(second.name, "b");
    }

    #[test]
    fn duplicate_add_for_same_key_coalesces() {
        let queue = WorkQueue::default();
        queue.add(req("c1", "a"));
        queue.add(req("c1", "a"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drop_cluster_removes_only_that_clusters_items() {
        let queue = WorkQueue::default();
        queue.add(req("c1", "a"));
        queue.add(req("c2", "a"));
        queue.drop_cluster("c1");
        assert_eq!(queue.len(), 1);
        let (item, _) = queue.get().unwrap();
        assert_eq!(item.cluster, "c2");
    }

    #[test]
    fn stop_unblocks_get() {
        let queue = WorkQueue::default();
        queue.stop();
        assert!(queue.get().is_none());
    }
}
