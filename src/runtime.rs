//! Container runtime facade.
//!
//! [`ContainerRuntime`] is the seam between the synchronization engine and
//! the actual container engine; [`DockerRuntime`] is the Docker Engine
//! implementation. Tests substitute their own implementations.

pub mod docker;
pub mod types;

pub use docker::DockerRuntime;
pub use types::{ContainerRuntime, EngineInfo, RawContainer, RawPort, RawStats};
