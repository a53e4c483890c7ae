use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::broadcast::BroadcastHub;
use crate::error_handling::types::ReconcileError;
use crate::state_sync::reconciler::StateReconciler;

/// How many consecutive failed cycles before published state counts as
/// stale.
const STALE_AFTER_FAILURES: u32 = 1;

/// Health of the sync loop, exposed on the dashboard's health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SyncHealth {
    pub runtime_available: bool,
    pub consecutive_failures: u32,
    pub last_sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub stale: bool,
}

impl SyncHealth {
    fn new() -> Self {
        Self {
            runtime_available: false,
            consecutive_failures: 0,
            last_sequence: 0,
            last_success_at: None,
            last_error: None,
            stale: true,
        }
    }

    fn record_success(&mut self, sequence: u64) {
        self.runtime_available = true;
        self.consecutive_failures = 0;
        self.last_sequence = sequence;
        self.last_success_at = Some(Utc::now());
        self.last_error = None;
        self.stale = false;
    }

    fn record_failure(&mut self, error: &ReconcileError) {
        self.runtime_available = false;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
        self.stale = self.consecutive_failures > STALE_AFTER_FAILURES;
    }
}

enum SyncCommand {
    /// Run a reconciliation cycle now. The sender, when present, receives
    /// the resulting sequence number or the cycle's error.
    Reconcile(Option<oneshot::Sender<Result<u64, ReconcileError>>>),
}

/// Handle for requesting out-of-band reconciliation from other tasks.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncCommand>,
    health: Arc<Mutex<SyncHealth>>,
}

impl SyncHandle {
    /// Forces a cycle ahead of the timer and waits for it to finish.
    ///
    /// Commands funnel through the same channel as timer ticks, so forced
    /// cycles never interleave with scheduled ones.
    pub async fn force_reconcile(&self) -> Result<u64, ReconcileError> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(SyncCommand::Reconcile(Some(tx))).await.is_err() {
            return Err(ReconcileError::RuntimeUnavailable(
                "sync engine is not running".to_string(),
            ));
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::RuntimeUnavailable(
                "sync engine dropped the request".to_string(),
            )),
        }
    }

    pub async fn health(&self) -> SyncHealth {
        self.health.lock().await.clone()
    }
}

/// Owns the reconciler and drives the periodic sync loop.
///
/// All publishing goes through this single task, which is what keeps the
/// snapshot sequence strictly ordered for every subscriber.
pub struct SyncEngine {
    reconciler: StateReconciler,
    hub: Arc<Mutex<BroadcastHub>>,
    health: Arc<Mutex<SyncHealth>>,
    rx: mpsc::Receiver<SyncCommand>,
    poll_interval: Duration,
}

impl SyncEngine {
    pub fn new(
        reconciler: StateReconciler,
        hub: Arc<Mutex<BroadcastHub>>,
        poll_interval: Duration,
    ) -> (Self, SyncHandle) {
        let (tx, rx) = mpsc::channel(16);
        let health = Arc::new(Mutex::new(SyncHealth::new()));
        let handle = SyncHandle {
            tx,
            health: Arc::clone(&health),
        };
        let engine = Self {
            reconciler,
            hub,
            health,
            rx,
            poll_interval,
        };
        (engine, handle)
    }

    /// Runs until every [`SyncHandle`] is dropped.
    pub async fn run(mut self) {
        info!(
            "Sync engine started, polling every {}s",
            self.poll_interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle(None).await;
                }
                command = self.rx.recv() => {
                    match command {
                        Some(SyncCommand::Reconcile(reply)) => {
                            self.cycle(reply).await;
                        }
                        None => {
                            info!("Sync engine shutting down");
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn cycle(&mut self, reply: Option<oneshot::Sender<Result<u64, ReconcileError>>>) {
        match self.reconciler.reconcile().await {
            Ok(snapshot) => {
                let sequence = snapshot.sequence;
                self.health.lock().await.record_success(sequence);
                self.hub.lock().await.publish(snapshot);
                if let Some(reply) = reply {
                    let _ = reply.send(Ok(sequence));
                }
            }
            Err(e) => {
                warn!("Reconciliation cycle failed: {}", e);
                self.health.lock().await.record_failure(&e);
                if let Some(reply) = reply {
                    let _ = reply.send(Err(e));
                }
            }
        }
    }
}
