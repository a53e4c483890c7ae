//! Push distribution of state snapshots.
//!
//! Subscribers get a full snapshot on connect, then incremental deltas in
//! strict sequence order.

pub mod hub;
pub mod types;

pub use hub::BroadcastHub;
pub use types::PushEvent;
