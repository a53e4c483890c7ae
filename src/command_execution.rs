//! Lifecycle command execution.
//!
//! Service start/stop goes through shell commands rather than the runtime
//! API; this module runs them with captured output and bounded duration.

pub mod executor;
pub mod types;

pub use executor::{CommandExecutor, CommandRunner};
pub use types::CommandOutput;
