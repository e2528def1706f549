//! Merge of raw snapshots with windowed series into the fleet view.
//!
//! This is a pure, synchronous transform: it validates every snapshot,
//! hides entities that stopped reporting, attaches their CPU and memory
//! series and sorts the survivors by name.

use fleetwatch_types::{is_recent, SeriesBundle, ViewRecord, CPU_METRIC, MEMORY_METRIC};

use super::payload::parse_report;
use super::threshold::Staleness;
use crate::error::Result;
use crate::source::Snapshot;

/// Metrics the fleet view asks the aggregator for.
pub const VIEW_METRICS: [&str; 2] = [CPU_METRIC, MEMORY_METRIC];

/// Build the sorted fleet view.
///
/// `now` is Unix seconds. A malformed payload fails the whole merge, even
/// for an entity that would have been hidden as stale: a partial view is
/// worse than keeping the previous one.
///
/// # Example
///
/// ```
/// use fleetwatch::{merge, Snapshot, Staleness};
/// use fleetwatch_types::SeriesBundle;
/// use serde_json::json;
/// use std::time::Duration;
///
/// let now = 1_700_000_000;
/// let payload = |name: &str| json!({
///     "name": name, "cpu": 5, "memory_used": 100, "memory_total": 1000, "storage": []
/// });
/// let snapshots = vec![
///     Snapshot::new("a", payload("A"), now - 10),
///     Snapshot::new("b", payload("B"), now - 120),
/// ];
///
/// let view = merge(
///     &snapshots,
///     &SeriesBundle::new(),
///     Staleness::after(Duration::from_secs(60)),
///     now,
/// )
/// .unwrap();
///
/// assert_eq!(view.len(), 1);
/// assert_eq!(view[0].name, "A");
/// assert!(view[0].recently_reported);
/// ```
pub fn merge<'a, I>(
    snapshots: I,
    series: &SeriesBundle,
    staleness: Staleness,
    now: i64,
) -> Result<Vec<ViewRecord>>
where
    I: IntoIterator<Item = &'a Snapshot>,
{
    let mut records = Vec::new();

    for snapshot in snapshots {
        let report = parse_report(&snapshot.entity_id, &snapshot.payload)?;

        let updated_at = snapshot.timestamp;
        let age = now.saturating_sub(updated_at);
        if staleness.is_stale(age) {
            continue;
        }

        records.push(ViewRecord {
            name: report.name,
            cpu_current: report.cpu,
            cpu: series.series_or_empty(&snapshot.entity_id, CPU_METRIC),
            memory_current: report.memory_used,
            memory_total: report.memory_total,
            memory: series.series_or_empty(&snapshot.entity_id, MEMORY_METRIC),
            storage: report.storage,
            updated_at,
            recently_reported: is_recent(age),
        });
    }

    records.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(records)
}
