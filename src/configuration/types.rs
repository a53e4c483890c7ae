use serde::Deserialize;

use crate::registry::types::{ServiceDefinition, ServicePort};

/// A `[[services]]` entry in the configuration file.
///
/// Entries add to or replace the built-in catalog, keyed by `service_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceOverride {
    pub service_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub container_names: Vec<String>,
    #[serde(default)]
    pub ports: Vec<PortOverride>,
    pub start_command: String,
    pub stop_command: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PortOverride {
    pub container: u16,
    pub host: u16,
    #[serde(default)]
    pub description: String,
}

impl From<ServiceOverride> for ServiceDefinition {
    fn from(o: ServiceOverride) -> Self {
        ServiceDefinition {
            service_id: o.service_id,
            display_name: o.display_name,
            description: o.description,
            container_names: o.container_names,
            ports: o
                .ports
                .into_iter()
                .map(|p| ServicePort {
                    container: p.container,
                    host: p.host,
                    description: p.description,
                })
                .collect(),
            start_command: o.start_command,
            stop_command: o.stop_command,
        }
    }
}
