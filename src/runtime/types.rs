use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error_handling::types::RuntimeError;

/// A container as reported by the runtime, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawContainer {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Runtime state string ("running", "exited", ...).
    pub state: String,
    /// Human status line ("Up 2 hours", "Exited (0) 3 days ago").
    pub status_text: String,
    pub ports: Vec<RawPort>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawPort {
    pub container_port: u16,
    pub host_port: Option<u16>,
    pub protocol: String,
}

/// Raw resource counters for one container.
///
/// CPU usage is cumulative; the runtime hands back the current sample and
/// the immediately preceding one so percentages can be derived from the
/// deltas without the caller keeping history.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawStats {
    pub cpu_total_usage: u64,
    pub precpu_total_usage: u64,
    pub system_cpu_usage: u64,
    pub presystem_cpu_usage: u64,
    pub online_cpus: u32,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
}

/// Engine-level information for the dashboard's system panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    pub version: String,
    pub api_version: String,
    pub containers_total: u64,
    pub containers_running: u64,
    pub images: u64,
    pub volumes: u64,
}

/// Thin interface over the container runtime.
///
/// Implementations may fail or time out on any call; callers decide whether
/// a failure is total (listing) or partial (stats for one container).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<RawContainer>, RuntimeError>;

    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError>;

    /// The most recent `tail` log lines, stdout and stderr interleaved.
    async fn logs(&self, container_id: &str, tail: usize) -> Result<Vec<String>, RuntimeError>;

    async fn engine_info(&self) -> Result<EngineInfo, RuntimeError>;

    async fn start_container(&self, container_id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, container_id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, container_id: &str) -> Result<(), RuntimeError>;
}
