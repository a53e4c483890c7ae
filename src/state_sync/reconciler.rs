use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::error_handling::types::ReconcileError;
use crate::registry::catalog::ServiceCatalog;
use crate::runtime::types::{ContainerRuntime, RawContainer};
use crate::state_sync::metrics;
use crate::state_sync::types::{
    ContainerRecord, ContainerState, PortBinding, ServiceRecord, ServiceStatus, Snapshot,
};

/// Builds snapshots by polling the container runtime.
///
/// Each successful cycle produces a new snapshot with a strictly increasing
/// sequence number. A cycle fails as a whole only when the container listing
/// itself fails; per-container stats failures degrade that container's
/// metrics and the cycle still succeeds.
pub struct StateReconciler {
    runtime: Arc<dyn ContainerRuntime>,
    catalog: ServiceCatalog,
    sequence: u64,
}

impl StateReconciler {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, catalog: ServiceCatalog) -> Self {
        Self {
            runtime,
            catalog,
            sequence: 0,
        }
    }

    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    /// Runs one reconciliation cycle.
    ///
    /// The sequence number advances only when the cycle succeeds, so a
    /// failed cycle never leaves a gap in the published stream.
    pub async fn reconcile(&mut self) -> Result<Snapshot, ReconcileError> {
        let raw = match self.runtime.list_containers().await {
            Ok(raw) => raw,
            Err(e) => {
                return Err(ReconcileError::RuntimeUnavailable(e.to_string()));
            }
        };

        let mut containers = Vec::with_capacity(raw.len());
        for container in &raw {
            containers.push(self.normalize(container).await);
        }
        containers.sort_by(|a: &ContainerRecord, b: &ContainerRecord| a.id.cmp(&b.id));

        let mut services: Vec<ServiceRecord> = self
            .catalog
            .iter()
            .map(|definition| {
                let mapped: Vec<&ContainerRecord> = containers
                    .iter()
                    .filter(|c| definition.maps_container(&c.name))
                    .collect();

                ServiceRecord {
                    service_id: definition.service_id.clone(),
                    display_name: definition.display_name.clone(),
                    description: definition.description.clone(),
                    status: aggregate_status(definition.container_names.len(), &mapped),
                    mapped_containers: mapped.iter().map(|c| c.id.clone()).collect(),
                    ports: definition.ports.clone(),
                }
            })
            .collect();
        services.sort_by(|a, b| a.service_id.cmp(&b.service_id));

        self.sequence += 1;
        let snapshot = Snapshot {
            sequence: self.sequence,
            taken_at: Utc::now(),
            containers,
            services,
        };
        debug!(
            "Reconciled snapshot {} with {} containers, {} services",
            snapshot.sequence,
            snapshot.containers.len(),
            snapshot.services.len()
        );
        Ok(snapshot)
    }

    async fn normalize(&self, raw: &RawContainer) -> ContainerRecord {
        let state = ContainerState::from_runtime(&raw.state);

        let metrics = if state.is_running() {
            match self.runtime.stats(&raw.id).await {
                Ok(stats) => Some(metrics::derive(&stats)),
                Err(e) => {
                    warn!("Stats query failed for container {}: {}", raw.name, e);
                    None
                }
            }
        } else {
            None
        };

        let uptime = if state.is_running() {
            raw.started_at.map(|started| {
                let elapsed = (Utc::now() - started).num_seconds().max(0) as u64;
                metrics::format_uptime(elapsed)
            })
        } else {
            None
        };

        ContainerRecord {
            id: raw.id.clone(),
            name: raw.name.clone(),
            image: raw.image.clone(),
            state,
            status_text: raw.status_text.clone(),
            ports: raw
                .ports
                .iter()
                .map(|p| PortBinding {
                    container_port: p.container_port,
                    host_port: p.host_port,
                    protocol: p.protocol.clone(),
                })
                .collect(),
            created_at: raw.created_at,
            started_at: raw.started_at,
            uptime,
            metrics,
        }
    }
}

/// Aggregate status over a service's mapped containers.
///
/// A definition mapping no container names cannot be observed at all and
/// reads `Unknown`. Every mapped container present and running reads
/// `Running`; every one absent or exited reads `Stopped`; any other mix
/// (one of two up, a container paused or restarting) is `Partial`.
fn aggregate_status(expected: usize, mapped: &[&ContainerRecord]) -> ServiceStatus {
    if expected == 0 {
        return ServiceStatus::Unknown;
    }
    let running = mapped.iter().filter(|c| c.state.is_running()).count();
    if running == expected {
        return ServiceStatus::Running;
    }
    let all_down = mapped
        .iter()
        .all(|c| matches!(c.state, ContainerState::Exited | ContainerState::Dead));
    if running == 0 && all_down {
        ServiceStatus::Stopped
    } else {
        ServiceStatus::Partial
    }
}
