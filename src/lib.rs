pub mod broadcast;
pub use broadcast::{BroadcastHub, PushEvent};

pub mod command_execution;
pub use command_execution::{CommandExecutor, CommandOutput, CommandRunner};

pub mod configuration;
pub use configuration::Settings;

pub mod control;
pub use control::{ContainerLogs, ControlPlane, ServiceAction, ServiceCommandOutcome};

pub mod error_handling;

pub mod registry;
pub use registry::{ServiceCatalog, ServiceDefinition};

pub mod runtime;
pub use runtime::{ContainerRuntime, DockerRuntime, EngineInfo};

pub mod state_sync;
pub use state_sync::{
    ContainerRecord, ContainerState, Delta, ServiceRecord, ServiceStatus, Snapshot, StateReconciler,
    SyncEngine, SyncHandle, SyncHealth,
};

pub mod web_interface;
pub use web_interface::WebServer;
