use serde::Serialize;

use crate::command_execution::types::CommandOutput;

/// Which lifecycle action a service command performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Start,
    Stop,
}

/// Log excerpt for one container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerLogs {
    pub container_id: String,
    pub lines: Vec<String>,
}

/// Result of running a service lifecycle command.
///
/// Returned for failed commands too; `success` tells them apart and the
/// captured output carries the diagnostics. `sequence` is the snapshot
/// sequence of the reconciliation that followed the command, when that
/// reconciliation succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCommandOutcome {
    pub service_id: String,
    pub action: ServiceAction,
    pub success: bool,
    pub output: CommandOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
}
