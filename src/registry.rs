//! Service registry.
//!
//! Maps logical service identifiers ("postgresql") to the runtime container
//! name(s) they own and the shell commands that bring them up or down.
//!
//! Re-exports:
//! - [`ServiceCatalog`]: lookup and iteration over definitions.
//! - [`ServiceDefinition`], [`ServicePort`]: the definition types.

pub mod catalog;
pub mod types;

pub use catalog::ServiceCatalog;
pub use types::{ServiceDefinition, ServicePort};
