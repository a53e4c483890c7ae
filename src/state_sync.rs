//! Container and service state synchronization.
//!
//! The reconciler polls the runtime into immutable snapshots, the engine
//! drives the polling loop and publishes every snapshot through the
//! broadcast hub exactly once, in sequence order.

pub mod diff;
pub mod engine;
pub mod metrics;
pub mod reconciler;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use engine::{SyncEngine, SyncHandle, SyncHealth};
pub use reconciler::StateReconciler;
pub use types::{ContainerRecord, ContainerState, Delta, ServiceRecord, ServiceStatus, Snapshot};
