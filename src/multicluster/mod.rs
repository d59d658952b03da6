//! Multi-cluster event dispatcher: one [`controller::MultiClusterController`]
//! per watched resource kind (spec.md §4.3).

pub mod controller;
pub mod queue;
pub mod spec;

/// Minimal metadata contract every object flowing through the controller,
/// the syncer engine and the naming rule must expose (spec.md §4.3, §6).
pub trait TenantObject: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn uid(&self) -> &str;
}
