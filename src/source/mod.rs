//! Upstream sources for raw snapshots and windowed series.
//!
//! Both the snapshot store and the series aggregator live outside this
//! crate. These traits are the seams the fleet view pulls through; the
//! bundled [`MemorySource`] and [`FileSource`] implement both.

mod file;
mod memory;
mod snapshot;

pub use file::FileSource;
pub use memory::MemorySource;
pub use snapshot::{FleetFile, SerializedSnapshot, Snapshot, SnapshotSet};

use std::fmt::{self, Debug};

use async_trait::async_trait;
use fleetwatch_types::SeriesBundle;

use crate::error::Result;

/// Snapshot kind carrying server system reports.
pub const SYSTEM_KIND: &str = "system";

/// How an aggregator reduces raw points within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Reducer {
    Average,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Average => f.write_str("avg"),
        }
    }
}

/// Provides the latest raw snapshot of every known entity.
///
/// Implementations discard superseded snapshots themselves; `latest`
/// returns at most one snapshot per entity.
#[async_trait]
pub trait SnapshotSource: Send + Sync + Debug {
    /// Latest snapshot per entity for the given kind.
    async fn latest(&self, kind: &str) -> Result<SnapshotSet>;

    /// Human-readable description, used in logs and the CLI status line.
    fn description(&self) -> &str;
}

/// Provides windowed, reduced series per entity.
#[async_trait]
pub trait SeriesAggregator: Send + Sync + Debug {
    /// Series for the given metric names, reduced with `reducer`.
    ///
    /// Entities or metrics without history are simply absent.
    async fn series(&self, metrics: &[&str], reducer: Reducer) -> Result<SeriesBundle>;
}
