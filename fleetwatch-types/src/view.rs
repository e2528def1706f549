//! Display-ready records built by the merge pipeline.

use crate::{MetricSeries, StorageUsage};

/// Age (seconds) up to which an entity counts as recently reported.
pub const RECENTLY_REPORTED_SECS: i64 = 30;

/// The merged, display-ready record for one entity.
///
/// Built fresh on every recompute and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewRecord {
    pub name: String,
    /// CPU usage from the latest report, whole percent.
    pub cpu_current: u32,
    /// Windowed CPU average.
    pub cpu: MetricSeries,
    /// Memory in use from the latest report, megabytes.
    pub memory_current: u64,
    pub memory_total: u64,
    /// Windowed memory average.
    pub memory: MetricSeries,
    pub storage: Vec<StorageUsage>,
    /// Timestamp of the source snapshot, Unix seconds.
    pub updated_at: i64,
    /// Whether the entity reported within the last
    /// [`RECENTLY_REPORTED_SECS`] seconds.
    pub recently_reported: bool,
}

impl ViewRecord {
    /// Seconds elapsed between the last report and `now` (Unix seconds).
    pub fn age_secs(&self, now: i64) -> i64 {
        now.saturating_sub(self.updated_at)
    }

    /// Used fraction of memory in `0.0..=1.0` (0 when the total is unknown).
    pub fn memory_ratio(&self) -> f64 {
        if self.memory_total == 0 {
            0.0
        } else {
            (self.memory_current as f64 / self.memory_total as f64).min(1.0)
        }
    }
}

/// Whether a report of the given age (seconds) counts as recent.
///
/// Negative ages (reports from the future) count as recent.
pub fn is_recent(age_secs: i64) -> bool {
    age_secs <= RECENTLY_REPORTED_SECS
}
