use log::{debug, info};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::broadcast::types::PushEvent;
use crate::state_sync::diff;
use crate::state_sync::types::Snapshot;

struct Subscriber {
    tx: UnboundedSender<PushEvent>,
    /// Sequence of the last event delivered to this subscriber.
    last_sequence: u64,
}

/// Fans published snapshots out to live subscribers.
///
/// The hub holds the latest snapshot so new subscribers get full state
/// immediately, then keeps each subscriber current with deltas. A subscriber
/// whose channel is closed is pruned on the next publish.
#[derive(Default)]
pub struct BroadcastHub {
    subscribers: HashMap<Uuid, Subscriber>,
    current: Option<Snapshot>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published snapshot, if any cycle has completed.
    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Registers a subscriber and delivers the current snapshot to it
    /// right away when one exists.
    pub fn subscribe(&mut self) -> (Uuid, UnboundedReceiver<PushEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut last_sequence = 0;
        if let Some(snapshot) = &self.current {
            last_sequence = snapshot.sequence;
            let _ = tx.send(PushEvent::Snapshot(snapshot.clone()));
        }

        info!("Subscriber {} connected", id);
        self.subscribers.insert(id, Subscriber { tx, last_sequence });
        (id, rx)
    }

    /// Removes a subscriber. A no-op if the id is already gone.
    pub fn unsubscribe(&mut self, id: Uuid) {
        if self.subscribers.remove(&id).is_some() {
            info!("Subscriber {} disconnected", id);
        }
    }

    /// Publishes a new snapshot, sending each live subscriber either the
    /// delta against what it last saw or a full snapshot when it is behind.
    pub fn publish(&mut self, snapshot: Snapshot) {
        let delta = self
            .current
            .as_ref()
            .map(|prev| diff::diff(prev, &snapshot));

        self.subscribers.retain(|id, sub| {
            let event = match &delta {
                Some(delta) if sub.last_sequence + 1 == snapshot.sequence => {
                    PushEvent::Delta(delta.clone())
                }
                _ => PushEvent::Snapshot(snapshot.clone()),
            };

            if sub.tx.send(event).is_err() {
                debug!("Pruning closed subscriber {}", id);
                return false;
            }
            sub.last_sequence = snapshot.sequence;
            true
        });

        self.current = Some(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_sync::types::{ContainerRecord, ContainerState};
    use chrono::Utc;

    fn container(id: &str, state: ContainerState) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            name: id.to_string(),
            image: "img".to_string(),
            state,
            status_text: String::new(),
            ports: Vec::new(),
            created_at: None,
            started_at: None,
            uptime: None,
            metrics: None,
        }
    }

    fn snapshot(seq: u64, containers: Vec<ContainerRecord>) -> Snapshot {
        Snapshot {
            sequence: seq,
            taken_at: Utc::now(),
            containers,
            services: Vec::new(),
        }
    }

    #[tokio::test]
    async fn new_subscriber_gets_current_snapshot_then_deltas() {
        let mut hub = BroadcastHub::new();
        hub.publish(snapshot(1, vec![container("a", ContainerState::Running)]));

        let (_id, mut rx) = hub.subscribe();
        match rx.recv().await {
            Some(PushEvent::Snapshot(s)) => assert_eq!(s.sequence, 1),
            other => panic!("expected snapshot, got {:?}", other),
        }

        hub.publish(snapshot(2, vec![container("a", ContainerState::Exited)]));
        match rx.recv().await {
            Some(PushEvent::Delta(d)) => {
                assert_eq!(d.sequence, 2);
                assert_eq!(d.containers_upserted.len(), 1);
            }
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn subscriber_before_first_publish_gets_full_snapshot() {
        let mut hub = BroadcastHub::new();
        let (_id, mut rx) = hub.subscribe();

        // nothing published yet, nothing delivered
        assert!(rx.try_recv().is_err());

        hub.publish(snapshot(1, vec![container("a", ContainerState::Running)]));
        match rx.recv().await {
            Some(PushEvent::Snapshot(s)) => assert_eq!(s.sequence, 1),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn events_arrive_in_sequence_order() {
        let mut hub = BroadcastHub::new();
        hub.publish(snapshot(1, vec![]));
        let (_id, mut rx) = hub.subscribe();

        for seq in 2..=5 {
            hub.publish(snapshot(
                seq,
                vec![container(&format!("c{}", seq), ContainerState::Running)],
            ));
        }

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.sequence());
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn dropped_receiver_is_pruned_on_publish() {
        let mut hub = BroadcastHub::new();
        hub.publish(snapshot(1, vec![]));

        let (_id, rx) = hub.subscribe();
        drop(rx);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(snapshot(2, vec![]));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let mut hub = BroadcastHub::new();
        let (id, _rx) = hub.subscribe();
        hub.unsubscribe(id);
        hub.unsubscribe(id);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
