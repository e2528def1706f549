//! # fleetwatch
//!
//! A fleet-wide health view of reporting servers: CPU, memory, storage and
//! how recently each one reported, shared by any number of concurrent
//! viewers without recomputing the merge for every request.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         FleetView                            │
//! │  ┌──────────┐   ┌──────────┐   ┌───────────────┐             │
//! │  │  source  │──▶│   data   │──▶│     cache     │──▶ viewers  │
//! │  │(upstream)│   │ (merge)  │   │ (once / tick) │      │      │
//! │  └──────────┘   └──────────┘   └───────────────┘      ▼      │
//! │   SnapshotSource                                   notify    │
//! │   SeriesAggregator                              (push event) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the upstream seams ([`SnapshotSource`],
//!   [`SeriesAggregator`]) with in-memory and file implementations
//! - **[`data`]**: payload validation, staleness thresholds and the merge
//!   into sorted [`ViewRecord`]s
//! - **[`cache`]**: the [`RecomputeCache`] that runs the merge at most once
//!   per refresh interval and serves the last good result
//! - **[`service`]**: [`FleetView`], which wires the above together
//! - **[`notify`]**: pushing updates to live viewers
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fleetwatch::{FleetView, MemorySource, Session, Staleness};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let source = Arc::new(MemorySource::new());
//! let now = chrono::Utc::now().timestamp();
//! source.record(
//!     "system",
//!     "web-1",
//!     json!({
//!         "name": "web-1",
//!         "cpu": 12,
//!         "memory_used": 2048,
//!         "memory_total": 8192,
//!         "storage": [{"directory": "/", "total": 100000, "used": 25000}]
//!     }),
//!     now,
//! );
//!
//! let view = FleetView::from_source(source)
//!     .refresh_interval(Duration::from_secs(5))
//!     .staleness(Staleness::after(Duration::from_secs(60)))
//!     .build();
//!
//! let payload = view.view(Session::Initial).await.unwrap();
//! assert_eq!(payload.entities[0].name, "web-1");
//! assert!(payload.entities[0].recently_reported);
//! # });
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod notify;
pub mod render;
pub mod service;
pub mod source;

pub use cache::{CacheEntry, CacheRegistry, RecomputeCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DurationValue, Settings};
pub use data::{merge, parse_report, Staleness, StalenessInput, VIEW_METRICS};
pub use error::{Error, FieldProblem, ProblemKind, Result};
pub use notify::{
    NoopNotifier, Notification, Session, ViewerNotifier, WatchNotifier, CHART_UPDATE_EVENT,
};
pub use service::{Entities, FleetView, FleetViewBuilder, ViewPayload};
pub use source::{
    FileSource, FleetFile, MemorySource, Reducer, SeriesAggregator, SerializedSnapshot, Snapshot,
    SnapshotSet, SnapshotSource, SYSTEM_KIND,
};

pub use fleetwatch_types::{
    EntityId, MetricSeries, SeriesBundle, SeriesPoint, StorageUsage, SystemReport, ViewRecord,
};
