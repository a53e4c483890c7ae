use serde::{Deserialize, Serialize};

use crate::state_sync::types::{Delta, Snapshot};

/// An event pushed to dashboard subscribers.
///
/// A subscriber always receives a full `Snapshot` first; afterwards it gets
/// `Delta` events as long as its last-seen sequence matches the publisher's,
/// and a fresh `Snapshot` whenever it would otherwise miss a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PushEvent {
    Snapshot(Snapshot),
    Delta(Delta),
}

impl PushEvent {
    pub fn sequence(&self) -> u64 {
        match self {
            PushEvent::Snapshot(s) => s.sequence,
            PushEvent::Delta(d) => d.sequence,
        }
    }
}
