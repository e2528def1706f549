//! In-memory source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fleetwatch_types::{EntityId, MetricSeries, SeriesBundle};
use parking_lot::RwLock;
use serde_json::Value;

use super::{Reducer, SeriesAggregator, Snapshot, SnapshotSet, SnapshotSource};
use crate::error::Result;

/// A thread-safe in-memory source for snapshots and series.
///
/// Useful for embedding fleetwatch in a process that already receives
/// reports, and for tests. Recording a snapshot for an entity replaces the
/// previous one.
///
/// # Example
///
/// ```
/// use fleetwatch::MemorySource;
/// use serde_json::json;
///
/// let source = MemorySource::new();
/// source.record("system", "web-1", json!({"name": "web-1"}), 1_700_000_000);
/// assert_eq!(source.len("system"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    kinds: RwLock<BTreeMap<String, SnapshotSet>>,
    series: RwLock<SeriesBundle>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest report of `entity`, replacing any older one.
    ///
    /// A report older than the stored one is ignored.
    pub fn record(
        &self,
        kind: &str,
        entity: impl Into<EntityId>,
        payload: Value,
        timestamp: i64,
    ) {
        let entity = entity.into();
        let mut kinds = self.kinds.write();
        let snapshots = kinds.entry(kind.to_string()).or_default();

        match snapshots.get(&entity) {
            Some(existing) if existing.timestamp > timestamp => {}
            _ => {
                snapshots.insert(entity.clone(), Snapshot::new(entity, payload, timestamp));
            }
        }
    }

    /// Forget an entity entirely.
    pub fn remove(&self, kind: &str, entity: &str) -> bool {
        self.kinds
            .write()
            .get_mut(kind)
            .map(|snapshots| snapshots.remove(entity).is_some())
            .unwrap_or(false)
    }

    /// Replace the series for one metric of one entity.
    pub fn set_series(&self, entity: impl Into<EntityId>, metric: &str, series: MetricSeries) {
        self.series.write().insert(entity, metric, series);
    }

    /// Number of entities of a kind.
    pub fn len(&self, kind: &str) -> usize {
        self.kinds.read().get(kind).map_or(0, |s| s.len())
    }

    pub fn is_empty(&self, kind: &str) -> bool {
        self.len(kind) == 0
    }
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn latest(&self, kind: &str) -> Result<SnapshotSet> {
        Ok(self.kinds.read().get(kind).cloned().unwrap_or_default())
    }

    fn description(&self) -> &str {
        "memory"
    }
}

#[async_trait]
impl SeriesAggregator for MemorySource {
    async fn series(&self, metrics: &[&str], _reducer: Reducer) -> Result<SeriesBundle> {
        let mut bundle = self.series.read().clone();
        bundle.retain_metrics(metrics);
        Ok(bundle)
    }
}
