//! Snapshot types and the fleet file format.
//!
//! A snapshot is the latest raw report of one entity. The raw payload stays
//! untyped here; it is validated by the merge pipeline.

use std::collections::BTreeMap;

use fleetwatch_types::{EntityId, SeriesBundle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The latest raw report of a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub entity_id: EntityId,
    /// Raw reported payload, validated later.
    pub payload: Value,
    /// Report time, Unix seconds.
    pub timestamp: i64,
}

impl Snapshot {
    pub fn new(entity_id: impl Into<EntityId>, payload: Value, timestamp: i64) -> Self {
        Self {
            entity_id: entity_id.into(),
            payload,
            timestamp,
        }
    }
}

/// Latest snapshot per entity, keyed by entity id.
pub type SnapshotSet = BTreeMap<EntityId, Snapshot>;

/// A snapshot as stored in a fleet file; the entity id is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    pub timestamp: i64,
    pub payload: Value,
}

/// On-disk fleet file: raw snapshots per kind plus pre-aggregated series.
///
/// Snapshots without an explicit kind are filed under `system`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetFile {
    #[serde(default)]
    pub snapshots: BTreeMap<EntityId, SerializedSnapshot>,
    #[serde(default)]
    pub kinds: BTreeMap<String, BTreeMap<EntityId, SerializedSnapshot>>,
    #[serde(default)]
    pub series: SeriesBundle,
}

impl FleetFile {
    /// Snapshots of the given kind.
    pub fn snapshots(&self, kind: &str) -> SnapshotSet {
        let entries = match self.kinds.get(kind) {
            Some(entries) => entries,
            None if kind == super::SYSTEM_KIND => &self.snapshots,
            None => return SnapshotSet::new(),
        };

        entries
            .iter()
            .map(|(id, s)| {
                (
                    id.clone(),
                    Snapshot::new(id.clone(), s.payload.clone(), s.timestamp),
                )
            })
            .collect()
    }
}
