//! Snapshot delta computation and application.
//!
//! The invariant both functions uphold: `apply(prev, &diff(prev, next))`
//! equals `next` for any two snapshots with sorted record lists.

use std::collections::BTreeMap;

use crate::state_sync::types::{ContainerRecord, Delta, ServiceRecord, Snapshot};

/// Computes the minimal delta that turns `prev` into `next`.
pub fn diff(prev: &Snapshot, next: &Snapshot) -> Delta {
    let prev_containers: BTreeMap<&str, &ContainerRecord> =
        prev.containers.iter().map(|c| (c.id.as_str(), c)).collect();
    let next_containers: BTreeMap<&str, &ContainerRecord> =
        next.containers.iter().map(|c| (c.id.as_str(), c)).collect();

    let containers_upserted = next
        .containers
        .iter()
        .filter(|c| prev_containers.get(c.id.as_str()).map_or(true, |prev| **prev != **c))
        .cloned()
        .collect();
    let containers_removed = prev
        .containers
        .iter()
        .filter(|c| !next_containers.contains_key(c.id.as_str()))
        .map(|c| c.id.clone())
        .collect();

    let prev_services: BTreeMap<&str, &ServiceRecord> = prev
        .services
        .iter()
        .map(|s| (s.service_id.as_str(), s))
        .collect();
    let next_services: BTreeMap<&str, &ServiceRecord> = next
        .services
        .iter()
        .map(|s| (s.service_id.as_str(), s))
        .collect();

    let services_upserted = next
        .services
        .iter()
        .filter(|s| prev_services.get(s.service_id.as_str()).map_or(true, |prev| **prev != **s))
        .cloned()
        .collect();
    let services_removed = prev
        .services
        .iter()
        .filter(|s| !next_services.contains_key(s.service_id.as_str()))
        .map(|s| s.service_id.clone())
        .collect();

    Delta {
        sequence: next.sequence,
        taken_at: next.taken_at,
        containers_upserted,
        containers_removed,
        services_upserted,
        services_removed,
    }
}

/// Applies a delta on top of `prev`, yielding the successor snapshot.
pub fn apply(prev: &Snapshot, delta: &Delta) -> Snapshot {
    let mut containers: BTreeMap<String, ContainerRecord> = prev
        .containers
        .iter()
        .map(|c| (c.id.clone(), c.clone()))
        .collect();
    for id in &delta.containers_removed {
        containers.remove(id);
    }
    for record in &delta.containers_upserted {
        containers.insert(record.id.clone(), record.clone());
    }

    let mut services: BTreeMap<String, ServiceRecord> = prev
        .services
        .iter()
        .map(|s| (s.service_id.clone(), s.clone()))
        .collect();
    for id in &delta.services_removed {
        services.remove(id);
    }
    for record in &delta.services_upserted {
        services.insert(record.service_id.clone(), record.clone());
    }

    Snapshot {
        sequence: delta.sequence,
        taken_at: delta.taken_at,
        containers: containers.into_values().collect(),
        services: services.into_values().collect(),
    }
}
