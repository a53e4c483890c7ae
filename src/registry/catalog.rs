use log::debug;

use crate::registry::types::{ServiceDefinition, ServicePort};

/// The set of logical services this instance manages.
///
/// Definitions keep insertion order so the dashboard lists services in a
/// stable sequence. The built-in catalog mirrors the services shipped with
/// the repository (database, cache, search engine); configuration may add
/// to or replace entries.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    definitions: Vec<ServiceDefinition>,
}

impl ServiceCatalog {
    pub fn new(definitions: Vec<ServiceDefinition>) -> Self {
        Self { definitions }
    }

    /// The default catalog: PostgreSQL, Redis, OpenSearch and OpenSearch
    /// Dashboards, driven through the repository Makefile targets.
    ///
    /// Dashboards shares OpenSearch's make targets because both are brought
    /// up by the same compose file.
    pub fn builtin() -> Self {
        let definitions = vec![
            ServiceDefinition {
                service_id: "postgresql".to_string(),
                display_name: "PostgreSQL".to_string(),
                description: "PostgreSQL database server for local development".to_string(),
                container_names: vec!["postgres".to_string()],
                ports: vec![port(5432, 5432, "PostgreSQL")],
                start_command: "make start-postgres".to_string(),
                stop_command: "make stop-postgres".to_string(),
            },
            ServiceDefinition {
                service_id: "redis".to_string(),
                display_name: "Redis".to_string(),
                description: "Redis cache and message broker for local development".to_string(),
                container_names: vec!["redis".to_string()],
                ports: vec![port(6379, 6379, "Redis")],
                start_command: "make start-redis".to_string(),
                stop_command: "make stop-redis".to_string(),
            },
            ServiceDefinition {
                service_id: "opensearch".to_string(),
                display_name: "OpenSearch".to_string(),
                description: "OpenSearch engine for search and analytics".to_string(),
                container_names: vec!["opensearch".to_string()],
                ports: vec![
                    port(9200, 9200, "OpenSearch API"),
                    port(9600, 9600, "OpenSearch Performance Analyzer"),
                ],
                start_command: "make start-opensearch".to_string(),
                stop_command: "make stop-opensearch".to_string(),
            },
            ServiceDefinition {
                service_id: "opensearch-dashboards".to_string(),
                display_name: "OpenSearch Dashboards".to_string(),
                description: "Web interface for OpenSearch data visualization".to_string(),
                container_names: vec!["opensearch-dashboards".to_string()],
                ports: vec![port(5601, 5601, "Dashboards Web UI")],
                start_command: "make start-opensearch".to_string(),
                stop_command: "make stop-opensearch".to_string(),
            },
        ];

        Self { definitions }
    }

    /// Inserts or replaces a definition, keyed by service id.
    pub fn upsert(&mut self, definition: ServiceDefinition) {
        if let Some(existing) = self
            .definitions
            .iter_mut()
            .find(|d| d.service_id == definition.service_id)
        {
            debug!("Replacing service definition: {}", definition.service_id);
            *existing = definition;
        } else {
            debug!("Adding service definition: {}", definition.service_id);
            self.definitions.push(definition);
        }
    }

    pub fn get(&self, service_id: &str) -> Option<&ServiceDefinition> {
        self.definitions.iter().find(|d| d.service_id == service_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn port(container: u16, host: u16, description: &str) -> ServicePort {
    ServicePort {
        container,
        host,
        description: description.to_string(),
    }
}
