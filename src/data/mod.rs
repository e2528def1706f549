//! Data models and processing for the fleet view.
//!
//! This module turns raw snapshots and windowed series into the sorted,
//! staleness-filtered list of view records.
//!
//! ## Submodules
//!
//! - [`duration`]: Parsing of human duration expressions (e.g., "2m", "1h30m")
//! - [`threshold`]: Staleness threshold input and resolution
//! - [`payload`]: Validation of raw payloads into system reports
//! - [`pipeline`]: The merge itself
//!
//! ## Data Flow
//!
//! ```text
//! SnapshotSet (raw JSON)      SeriesBundle (cpu, memory)
//!        │                            │
//!        ▼                            │
//! payload::parse_report()             │
//!        │                            │
//!        ├──▶ Staleness::is_stale() ──┤ (dropped)
//!        │                            │
//!        ▼                            ▼
//!   ViewRecord ◀──────── series_or_empty()
//!        │
//!        ▼
//!  sorted by name
//! ```

pub mod duration;
pub mod payload;
pub mod pipeline;
pub mod threshold;

pub use payload::parse_report;
pub use pipeline::{merge, VIEW_METRICS};
pub use threshold::{Staleness, StalenessInput};
