use serde::{Deserialize, Serialize};

/// A port published by a managed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    pub container: u16,
    pub host: u16,
    pub description: String,
}

/// Static definition of a logical service.
///
/// A logical service ("PostgreSQL") owns no runtime identity of its own; it
/// is mapped onto one or more runtime containers by name, and brought up or
/// down through shell commands (`make start-postgres` and friends in the
/// default catalog).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub service_id: String,
    pub display_name: String,
    pub description: String,
    pub container_names: Vec<String>,
    pub ports: Vec<ServicePort>,
    pub start_command: String,
    pub stop_command: String,
}

impl ServiceDefinition {
    /// Whether `container_name` is one of this service's mapped containers.
    pub fn maps_container(&self, container_name: &str) -> bool {
        self.container_names.iter().any(|n| n == container_name)
    }
}
