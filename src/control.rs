//! Control surface for dashboard-initiated actions.

pub mod control_plane;
pub mod types;

pub use control_plane::ControlPlane;
pub use types::{ContainerLogs, ServiceAction, ServiceCommandOutcome};
