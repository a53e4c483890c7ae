use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::broadcast::{BroadcastHub, PushEvent};
use crate::error_handling::types::RuntimeError;
use crate::registry::catalog::ServiceCatalog;
use crate::registry::types::ServiceDefinition;
use crate::runtime::types::{ContainerRuntime, EngineInfo, RawContainer, RawStats};
use crate::state_sync::engine::SyncEngine;
use crate::state_sync::reconciler::StateReconciler;
use crate::state_sync::types::ServiceStatus;

/// Scripted runtime for reconciler tests.
#[derive(Default)]
pub struct MockRuntime {
    containers: StdMutex<Vec<RawContainer>>,
    list_fails: AtomicBool,
    container_ops_fail: AtomicBool,
    stats_fail_for: StdMutex<HashSet<String>>,
}

impl MockRuntime {
    pub fn with_containers(containers: Vec<RawContainer>) -> Self {
        Self {
            containers: StdMutex::new(containers),
            ..Default::default()
        }
    }

    pub fn set_containers(&self, containers: Vec<RawContainer>) {
        *self.containers.lock().unwrap() = containers;
    }

    pub fn fail_listing(&self, fail: bool) {
        self.list_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_container_ops(&self, fail: bool) {
        self.container_ops_fail.store(fail, Ordering::SeqCst);
    }

    fn container_op(&self) -> Result<(), RuntimeError> {
        if self.container_ops_fail.load(Ordering::SeqCst) {
            Err(RuntimeError::Timeout("container op".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn fail_stats_for(&self, container_id: &str) {
        self.stats_fail_for
            .lock()
            .unwrap()
            .insert(container_id.to_string());
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_containers(&self) -> Result<Vec<RawContainer>, RuntimeError> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(RuntimeError::Unavailable("daemon is down".to_string()));
        }
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn stats(&self, container_id: &str) -> Result<RawStats, RuntimeError> {
        if self.stats_fail_for.lock().unwrap().contains(container_id) {
            return Err(RuntimeError::Timeout(container_id.to_string()));
        }
        Ok(RawStats {
            cpu_total_usage: 1200,
            precpu_total_usage: 1000,
            system_cpu_usage: 11_000,
            presystem_cpu_usage: 10_000,
            online_cpus: 2,
            memory_usage_bytes: 100,
            memory_limit_bytes: 400,
        })
    }

    async fn logs(&self, container_id: &str, tail: usize) -> Result<Vec<String>, RuntimeError> {
        Ok(vec![format!("{} log line, tail {}", container_id, tail)])
    }

    async fn engine_info(&self) -> Result<EngineInfo, RuntimeError> {
        Ok(EngineInfo {
            version: "24.0.0".to_string(),
            api_version: "1.43".to_string(),
            containers_total: self.containers.lock().unwrap().len() as u64,
            containers_running: 0,
            images: 3,
            volumes: 2,
        })
    }

    async fn start_container(&self, _container_id: &str) -> Result<(), RuntimeError> {
        self.container_op()
    }

    async fn stop_container(&self, _container_id: &str) -> Result<(), RuntimeError> {
        self.container_op()
    }

    async fn remove_container(&self, _container_id: &str) -> Result<(), RuntimeError> {
        self.container_op()
    }
}

pub fn raw_container(id: &str, name: &str, state: &str) -> RawContainer {
    RawContainer {
        id: id.to_string(),
        name: name.to_string(),
        image: "img:latest".to_string(),
        state: state.to_string(),
        status_text: String::new(),
        ports: Vec::new(),
        created_at: None,
        started_at: None,
    }
}

fn two_container_catalog() -> ServiceCatalog {
    ServiceCatalog::new(vec![ServiceDefinition {
        service_id: "opensearch".to_string(),
        display_name: "OpenSearch".to_string(),
        description: String::new(),
        container_names: vec![
            "opensearch".to_string(),
            "opensearch-dashboards".to_string(),
        ],
        ports: Vec::new(),
        start_command: "make start-opensearch".to_string(),
        stop_command: "make stop-opensearch".to_string(),
    }])
}

#[tokio::test]
async fn stats_failure_degrades_one_container_only() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![
        raw_container("aaa", "postgres", "running"),
        raw_container("bbb", "redis", "running"),
    ]));
    runtime.fail_stats_for("bbb");

    let mut reconciler = StateReconciler::new(runtime, ServiceCatalog::builtin());
    let snapshot = reconciler.reconcile().await.unwrap();

    let postgres = snapshot.container("aaa").unwrap();
    let redis = snapshot.container("bbb").unwrap();
    assert!(postgres.metrics.is_some());
    assert!(redis.metrics.is_none());
    assert!(redis.state.is_running());
}

#[tokio::test]
async fn listing_failure_fails_the_cycle_without_advancing_sequence() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
        "aaa", "postgres", "running",
    )]));
    let runtime_handle: Arc<dyn ContainerRuntime> = runtime.clone();
    let mut reconciler = StateReconciler::new(runtime_handle, ServiceCatalog::builtin());

    let first = reconciler.reconcile().await.unwrap();
    assert_eq!(first.sequence, 1);

    runtime.fail_listing(true);
    assert!(reconciler.reconcile().await.is_err());
    assert_eq!(reconciler.last_sequence(), 1);

    runtime.fail_listing(false);
    let next = reconciler.reconcile().await.unwrap();
    assert_eq!(next.sequence, 2);
}

#[tokio::test]
async fn absent_containers_read_as_stopped_service() {
    let runtime = Arc::new(MockRuntime::default());
    let mut reconciler = StateReconciler::new(runtime, ServiceCatalog::builtin());

    let snapshot = reconciler.reconcile().await.unwrap();
    let service = snapshot.service("postgresql").unwrap();
    assert_eq!(service.status, ServiceStatus::Stopped);
    assert!(service.mapped_containers.is_empty());
}

#[tokio::test]
async fn all_running_containers_read_as_running_service() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![
        raw_container("aaa", "opensearch", "running"),
        raw_container("bbb", "opensearch-dashboards", "running"),
    ]));
    let mut reconciler = StateReconciler::new(runtime, two_container_catalog());

    let snapshot = reconciler.reconcile().await.unwrap();
    let service = snapshot.service("opensearch").unwrap();
    assert_eq!(service.status, ServiceStatus::Running);
    assert_eq!(service.mapped_containers.len(), 2);
}

#[tokio::test]
async fn one_of_two_running_reads_as_partial_service() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![
        raw_container("aaa", "opensearch", "running"),
        raw_container("bbb", "opensearch-dashboards", "exited"),
    ]));
    let mut reconciler = StateReconciler::new(runtime, two_container_catalog());

    let snapshot = reconciler.reconcile().await.unwrap();
    assert_eq!(
        snapshot.service("opensearch").unwrap().status,
        ServiceStatus::Partial
    );
}

#[tokio::test]
async fn sequence_is_strictly_monotonic_across_cycles() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
        "aaa", "redis", "running",
    )]));
    let mut reconciler = StateReconciler::new(runtime, ServiceCatalog::builtin());

    let mut previous = 0;
    for _ in 0..5 {
        let snapshot = reconciler.reconcile().await.unwrap();
        assert_eq!(snapshot.sequence, previous + 1);
        previous = snapshot.sequence;
    }
}

#[tokio::test]
async fn forced_reconcile_publishes_through_the_hub() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![raw_container(
        "aaa", "redis", "running",
    )]));
    let reconciler = StateReconciler::new(runtime, ServiceCatalog::builtin());
    let hub = Arc::new(Mutex::new(BroadcastHub::new()));

    let (engine, handle) = SyncEngine::new(
        reconciler,
        Arc::clone(&hub),
        Duration::from_secs(3600),
    );
    tokio::spawn(engine.run());

    let sequence = handle.force_reconcile().await.unwrap();
    assert!(sequence >= 1);

    // the startup tick may have published as well, so the hub's current
    // snapshot is at least the forced one
    let (_id, mut rx) = hub.lock().await.subscribe();
    match rx.recv().await {
        Some(PushEvent::Snapshot(s)) => assert!(s.sequence >= sequence),
        other => panic!("expected snapshot, got {:?}", other),
    }

    let health = handle.health().await;
    assert!(health.runtime_available);
    assert!(!health.stale);
    assert_eq!(health.consecutive_failures, 0);
}

#[tokio::test]
async fn repeated_failures_mark_the_health_stale() {
    let runtime = Arc::new(MockRuntime::default());
    runtime.fail_listing(true);
    let runtime_handle: Arc<dyn ContainerRuntime> = runtime.clone();
    let reconciler = StateReconciler::new(runtime_handle, ServiceCatalog::builtin());
    let hub = Arc::new(Mutex::new(BroadcastHub::new()));

    let (engine, handle) = SyncEngine::new(
        reconciler,
        Arc::clone(&hub),
        Duration::from_secs(3600),
    );
    tokio::spawn(engine.run());

    assert!(handle.force_reconcile().await.is_err());
    assert!(handle.force_reconcile().await.is_err());

    let health = handle.health().await;
    assert!(!health.runtime_available);
    assert!(health.consecutive_failures >= 2);
    assert!(health.stale);
    assert!(health.last_error.is_some());
}
