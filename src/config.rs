//! Process configuration (SPEC_FULL.md §2): GC intervals, patrol/UWS
//! frequency, worker-pool sizing, and the shadow-cluster sentinel. Mirrors
//! the teacher's `SimulationConfig`: a flat, `serde`-deserializable struct
//! loaded once at startup from a YAML file.

use std::time::Duration;

use serde::Deserialize;

use crate::multicluster::controller::WorkerPoolSize;

fn default_shadow_gc_interval_secs() -> f64 {
    30.0
}

fn default_vnode_gc_interval_secs() -> f64 {
    10.0
}

fn default_vnode_gc_grace_period_secs() -> f64 {
    300.0
}

fn default_patrol_interval_secs() -> f64 {
    60.0
}

fn default_uws_interval_secs() -> f64 {
    5.0
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Name tag for this process, used only in log lines.
    pub name: String,
    /// If not set, logs go to stdout/stderr.
    pub logs_filepath: Option<String>,

    #[serde(default = "default_shadow_gc_interval_secs")]
    pub shadow_gc_interval_secs: f64,
    #[serde(default = "default_vnode_gc_interval_secs")]
    pub vnode_gc_interval_secs: f64,
    #[serde(default = "default_vnode_gc_grace_period_secs")]
    pub vnode_gc_grace_period_secs: f64,
    #[serde(default = "default_patrol_interval_secs")]
    pub patrol_interval_secs: f64,
    #[serde(default = "default_uws_interval_secs")]
    pub uws_interval_secs: f64,

    #[serde(default)]
    pub worker_pools: WorkerPoolConfig,
}

impl Config {
    pub fn shadow_gc_interval(&self) -> Duration {
        Duration::from_secs_f64(self.shadow_gc_interval_secs)
    }

    pub fn vnode_gc_interval(&self) -> Duration {
        Duration::from_secs_f64(self.vnode_gc_interval_secs)
    }

    pub fn vnode_gc_grace_period(&self) -> Duration {
        Duration::from_secs_f64(self.vnode_gc_grace_period_secs)
    }

    pub fn patrol_interval(&self) -> Duration {
        Duration::from_secs_f64(self.patrol_interval_secs)
    }

    pub fn uws_interval(&self) -> Duration {
        Duration::from_secs_f64(self.uws_interval_secs)
    }
}

/// Per-kind worker pool sizes (spec.md §4.3, SPEC_FULL.md §4.3), keyed by
/// priority class rather than by kind name since every reference kind this
/// crate ships reconciles at one of three fixed rates.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WorkerPoolConfig {
    #[serde(default = "WorkerPoolConfig::default_low")]
    pub low: usize,
    #[serde(default = "WorkerPoolConfig::default_medium")]
    pub medium: usize,
    #[serde(default = "WorkerPoolConfig::default_high")]
    pub high: usize,
}

impl WorkerPoolConfig {
    fn default_low() -> usize {
        WorkerPoolSize::Low.worker_count()
    }

    fn default_medium() -> usize {
        WorkerPoolSize::Medium.worker_count()
    }

    fn default_high() -> usize {
        WorkerPoolSize::High.worker_count()
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            low: Self::default_low(),
            medium: Self::default_medium(),
            high: Self::default_high(),
        }
    }
}
