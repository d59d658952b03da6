//! Core of a multi-tenant virtual-cluster control plane: a scheduler cache
//! (capacity accounting, two-phase resource commitment, slice allocation,
//! shadow clusters, snapshot isolation) plus a downward/upward syncer
//! engine (reconciliation, patrol, orphan GC). See `SPEC_FULL.md` for the
//! full requirements this crate implements and `DESIGN.md` for how each
//! part is grounded.

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod multicluster;
pub mod syncer;
pub mod test_util;
