use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::types::ServicePort;

/// Runtime state of a single container, mirroring the engine's lifecycle
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerState {
    /// Maps the runtime's state string. Anything unrecognized collapses to
    /// `Dead`; the raw text is preserved in the record's status line.
    pub fn from_runtime(raw: &str) -> Self {
        match raw {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            _ => ContainerState::Dead,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

/// A port mapping as published by the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortBinding {
    pub container_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    pub protocol: String,
}

/// Derived resource usage for one running container.
///
/// Recomputed on every reconciliation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_limit_bytes: u64,
    pub memory_percent: f64,
}

/// Normalized view of one container at a reconciliation instant.
///
/// `metrics` is `None` when the stats query for this container failed or
/// the container is not running; the rest of the record stays valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub status_text: String,
    pub ports: Vec<PortBinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ResourceMetrics>,
}

/// Aggregate status of a logical service, derived from its mapped
/// containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Partial,
    Unknown,
}

/// A logical service joined against the current container set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_id: String,
    pub display_name: String,
    pub description: String,
    pub status: ServiceStatus,
    pub mapped_containers: Vec<String>,
    pub ports: Vec<ServicePort>,
}

/// Immutable full state at one reconciliation instant.
///
/// Container and service lists are kept sorted by key so snapshots compare
/// and diff deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub taken_at: DateTime<Utc>,
    pub containers: Vec<ContainerRecord>,
    pub services: Vec<ServiceRecord>,
}

impl Snapshot {
    pub fn container(&self, id: &str) -> Option<&ContainerRecord> {
        self.containers.iter().find(|c| c.id == id)
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceRecord> {
        self.services.iter().find(|s| s.service_id == service_id)
    }
}

/// Minimal difference between two consecutive snapshots.
///
/// Applying a delta to the prior snapshot reproduces the new one exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub sequence: u64,
    pub taken_at: DateTime<Utc>,
    pub containers_upserted: Vec<ContainerRecord>,
    pub containers_removed: Vec<String>,
    pub services_upserted: Vec<ServiceRecord>,
    pub services_removed: Vec<String>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.containers_upserted.is_empty()
            && self.containers_removed.is_empty()
            && self.services_upserted.is_empty()
            && self.services_removed.is_empty()
    }
}
