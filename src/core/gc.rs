//! Background shadow-cluster garbage collector (spec.md §4.2, §5).
//!
//! Runs on its own thread with a stop channel, the closest idiomatic
//! analogue available to the teacher's per-component simulation timers now
//! that the engine runs in wall-clock rather than simulated time (see
//! SPEC_FULL.md §5).

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::core::scheduler_cache::SchedulerCache;

pub struct StopHandle {
    tx: mpsc::Sender<()>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl StopHandle {
    /// Signals the loop to stop and blocks until it has drained and exited.
    pub fn stop(mut self) {
        let _ = self.tx.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Spawns a loop that calls [`SchedulerCache::gc_shadow_clusters`] every
/// `interval` until stopped.
pub fn spawn_shadow_gc(cache: Arc<SchedulerCache>, interval: Duration) -> StopHandle {
    let (tx, rx) = mpsc::channel::<()>();
    let join = std::thread::spawn(move || loop {
        match rx.recv_timeout(interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let removed = cache.gc_shadow_clusters();
                if !removed.is_empty() {
                    info!("shadow cluster gc removed: {:?}", removed);
                }
            }
        }
    });
    StopHandle {
        tx,
        join: Some(join),
    }
}
