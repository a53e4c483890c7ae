use log::{info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use crate::broadcast::BroadcastHub;
use crate::command_execution::executor::CommandRunner;
use crate::control::types::{ContainerLogs, ServiceAction, ServiceCommandOutcome};
use crate::error_handling::types::{ControlError, RuntimeError};
use crate::registry::catalog::ServiceCatalog;
use crate::runtime::types::{ContainerRuntime, EngineInfo};
use crate::state_sync::engine::SyncHandle;
use crate::state_sync::types::{ContainerRecord, ServiceRecord};

/// Entry point for every mutation the dashboard can request.
///
/// Service lifecycle goes through shell commands; individual containers go
/// straight through the runtime. Every mutation is followed by a forced
/// reconciliation so the published state reflects the result without
/// waiting for the next timer tick.
pub struct ControlPlane {
    catalog: ServiceCatalog,
    runtime: Arc<dyn ContainerRuntime>,
    executor: Arc<dyn CommandRunner>,
    sync: SyncHandle,
    hub: Arc<Mutex<BroadcastHub>>,
    /// One lock per command key; a held lock rejects, not queues, the next
    /// command for the same key.
    command_locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ControlPlane {
    pub fn new(
        catalog: ServiceCatalog,
        runtime: Arc<dyn ContainerRuntime>,
        executor: Arc<dyn CommandRunner>,
        sync: SyncHandle,
        hub: Arc<Mutex<BroadcastHub>>,
    ) -> Self {
        Self {
            catalog,
            runtime,
            executor,
            sync,
            hub,
            command_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Current service view, from the latest published snapshot.
    pub async fn list_services(&self) -> Vec<ServiceRecord> {
        match self.hub.lock().await.current() {
            Some(snapshot) => snapshot.services.clone(),
            None => Vec::new(),
        }
    }

    /// Current container view, from the latest published snapshot.
    pub async fn list_containers(&self) -> Vec<ContainerRecord> {
        match self.hub.lock().await.current() {
            Some(snapshot) => snapshot.containers.clone(),
            None => Vec::new(),
        }
    }

    pub async fn start_service(
        &self,
        service_id: &str,
    ) -> Result<ServiceCommandOutcome, ControlError> {
        self.run_service_command(service_id, ServiceAction::Start)
            .await
    }

    pub async fn stop_service(
        &self,
        service_id: &str,
    ) -> Result<ServiceCommandOutcome, ControlError> {
        self.run_service_command(service_id, ServiceAction::Stop)
            .await
    }

    async fn run_service_command(
        &self,
        service_id: &str,
        action: ServiceAction,
    ) -> Result<ServiceCommandOutcome, ControlError> {
        let definition = self
            .catalog
            .get(service_id)
            .ok_or_else(|| ControlError::UnknownService(service_id.to_string()))?;

        let command = match action {
            ServiceAction::Start => definition.start_command.clone(),
            ServiceAction::Stop => definition.stop_command.clone(),
        };

        // Services sharing a command (compose siblings) share a key, so
        // they cannot trample each other's bring-up.
        let _guard = self.acquire_command_lock(&command)?;

        info!("Running {:?} for service {}: {}", action, service_id, command);
        let output = self.executor.run(&command).await;
        if !output.succeeded() {
            warn!(
                "Command for service {} failed with exit code {}",
                service_id, output.exit_code
            );
        }

        let sequence = match self.sync.force_reconcile().await {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                warn!("Post-command reconciliation failed: {}", e);
                None
            }
        };

        Ok(ServiceCommandOutcome {
            service_id: service_id.to_string(),
            action,
            success: output.succeeded(),
            output,
            sequence,
        })
    }

    pub async fn start_container(&self, container_id: &str) -> Result<u64, ControlError> {
        self.known_container(container_id).await?;
        let _guard = self.acquire_command_lock(container_id)?;
        let result = self.runtime.start_container(container_id).await;
        self.reconcile_after(result).await
    }

    pub async fn stop_container(&self, container_id: &str) -> Result<u64, ControlError> {
        self.known_container(container_id).await?;
        let _guard = self.acquire_command_lock(container_id)?;
        let result = self.runtime.stop_container(container_id).await;
        self.reconcile_after(result).await
    }

    pub async fn remove_container(&self, container_id: &str) -> Result<u64, ControlError> {
        self.known_container(container_id).await?;
        let _guard = self.acquire_command_lock(container_id)?;
        let result = self.runtime.remove_container(container_id).await;
        self.reconcile_after(result).await
    }

    /// Reconciles after a container action, success or failure. A timed-out
    /// stop may still have taken effect, so the published state must be
    /// refreshed before the error is reported.
    async fn reconcile_after(
        &self,
        result: Result<(), RuntimeError>,
    ) -> Result<u64, ControlError> {
        let reconciled = self.sync.force_reconcile().await;
        result?;
        Ok(reconciled?)
    }

    /// Recent log lines for one container; read-only, no reconcile needed.
    pub async fn container_logs(
        &self,
        container_id: &str,
        tail: usize,
    ) -> Result<ContainerLogs, ControlError> {
        self.known_container(container_id).await?;
        let lines = self.runtime.logs(container_id, tail).await?;
        Ok(ContainerLogs {
            container_id: container_id.to_string(),
            lines,
        })
    }

    /// Engine version and object counts for the system panel.
    pub async fn system_info(&self) -> Result<EngineInfo, ControlError> {
        Ok(self.runtime.engine_info().await?)
    }

    /// Rejects container ids the published state has never seen.
    async fn known_container(&self, container_id: &str) -> Result<(), ControlError> {
        let known = self
            .hub
            .lock()
            .await
            .current()
            .map(|snapshot| snapshot.container(container_id).is_some())
            .unwrap_or(false);
        if known {
            Ok(())
        } else {
            Err(ControlError::UnknownContainer(container_id.to_string()))
        }
    }

    fn acquire_command_lock(
        &self,
        key: &str,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, ControlError> {
        let lock = {
            // lock holders never panic while holding; recover anyway
            let mut locks = self
                .command_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.try_lock_owned()
            .map_err(|_| ControlError::CommandInFlight(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_execution::types::CommandOutput;
    use crate::state_sync::engine::SyncEngine;
    use crate::state_sync::reconciler::StateReconciler;
    use crate::state_sync::tests::{raw_container, MockRuntime};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Runner that holds every command open until released.
    struct SlowRunner {
        release: Mutex<tokio::sync::mpsc::Receiver<()>>,
    }

    #[async_trait]
    impl CommandRunner for SlowRunner {
        async fn run(&self, command: &str) -> CommandOutput {
            self.release.lock().await.recv().await;
            CommandOutput {
                command: command.to_string(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
            }
        }
    }

    struct InstantRunner;

    #[async_trait]
    impl CommandRunner for InstantRunner {
        async fn run(&self, command: &str) -> CommandOutput {
            CommandOutput {
                command: command.to_string(),
                exit_code: 0,
                stdout: "done".to_string(),
                stderr: String::new(),
                timed_out: false,
            }
        }
    }

    fn control_plane(
        runtime: Arc<MockRuntime>,
        executor: Arc<dyn CommandRunner>,
    ) -> Arc<ControlPlane> {
        let hub = Arc::new(Mutex::new(BroadcastHub::new()));
        let runtime_for_reconciler: Arc<dyn ContainerRuntime> = runtime.clone();
        let reconciler =
            StateReconciler::new(runtime_for_reconciler, ServiceCatalog::builtin());
        let (engine, handle) =
            SyncEngine::new(reconciler, Arc::clone(&hub), Duration::from_secs(3600));
        tokio::spawn(engine.run());

        Arc::new(ControlPlane::new(
            ServiceCatalog::builtin(),
            runtime,
            executor,
            handle,
            hub,
        ))
    }

    #[tokio::test]
    async fn unknown_service_is_rejected() {
        let control = control_plane(Arc::new(MockRuntime::default()), Arc::new(InstantRunner));
        let result = control.start_service("mysql").await;
        assert!(matches!(result, Err(ControlError::UnknownService(_))));
    }

    #[tokio::test]
    async fn successful_command_reports_outcome_and_sequence() {
        let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
            "aaa", "redis", "running",
        )]));
        let control = control_plane(runtime, Arc::new(InstantRunner));

        let outcome = control.start_service("redis").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.action, ServiceAction::Start);
        assert_eq!(outcome.output.command, "make start-redis");
        assert!(outcome.sequence.is_some());
    }

    #[tokio::test]
    async fn concurrent_commands_for_one_service_are_rejected() {
        let (release_tx, release_rx) = tokio::sync::mpsc::channel(1);
        let runner = Arc::new(SlowRunner {
            release: Mutex::new(release_rx),
        });
        let control = control_plane(Arc::new(MockRuntime::default()), runner);

        let control2 = Arc::clone(&control);
        let first = tokio::spawn(async move { control2.stop_service("redis").await });

        // give the first command time to take the lock
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = control.stop_service("redis").await;
        assert!(matches!(second, Err(ControlError::CommandInFlight(_))));

        release_tx.send(()).await.unwrap();
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.success);

        // the lock is free again once the first command finished
        release_tx.send(()).await.unwrap();
        let third = control.stop_service("redis").await.unwrap();
        assert!(third.success);
    }

    #[tokio::test]
    async fn sibling_services_sharing_a_command_share_the_lock() {
        let (_release_tx, release_rx) = tokio::sync::mpsc::channel::<()>(1);
        let runner = Arc::new(SlowRunner {
            release: Mutex::new(release_rx),
        });
        let control = control_plane(Arc::new(MockRuntime::default()), runner);

        let control2 = Arc::clone(&control);
        let _first = tokio::spawn(async move { control2.start_service("opensearch").await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = control.start_service("opensearch-dashboards").await;
        assert!(matches!(second, Err(ControlError::CommandInFlight(_))));
    }

    #[tokio::test]
    async fn failed_container_op_still_refreshes_published_state() {
        let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
            "aaa", "redis", "running",
        )]));
        let control = control_plane(Arc::clone(&runtime), Arc::new(InstantRunner));
        control.sync.force_reconcile().await.unwrap();
        let before = control.hub.lock().await.current().unwrap().sequence;

        // a timed-out stop may still have taken effect on the daemon side
        runtime.fail_container_ops(true);
        let result = control.stop_container("aaa").await;
        assert!(matches!(result, Err(ControlError::Runtime(_))));

        let after = control.hub.lock().await.current().unwrap().sequence;
        assert!(after > before);
    }

    #[tokio::test]
    async fn logs_and_system_info_pass_through_the_runtime() {
        let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
            "aaa", "redis", "running",
        )]));
        let control = control_plane(Arc::clone(&runtime), Arc::new(InstantRunner));
        control.sync.force_reconcile().await.unwrap();

        let logs = control.container_logs("aaa", 50).await.unwrap();
        assert_eq!(logs.container_id, "aaa");
        assert!(logs.lines[0].contains("tail 50"));

        assert!(matches!(
            control.container_logs("zzz", 50).await,
            Err(ControlError::UnknownContainer(_))
        ));

        let info = control.system_info().await.unwrap();
        assert_eq!(info.version, "24.0.0");
        assert_eq!(info.containers_total, 1);
    }

    #[tokio::test]
    async fn container_commands_require_a_known_container() {
        let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
            "aaa", "redis", "running",
        )]));
        let control = control_plane(Arc::clone(&runtime), Arc::new(InstantRunner));

        control.sync.force_reconcile().await.unwrap();
        assert!(control.stop_container("aaa").await.is_ok());
        assert!(matches!(
            control.stop_container("zzz").await,
            Err(ControlError::UnknownContainer(_))
        ));
    }
}
