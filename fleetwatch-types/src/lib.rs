//! # fleetwatch-types
//!
//! Core types for fleet health views. This crate defines the data model that
//! flows between a snapshot source, the merge pipeline and whatever renders
//! the result: windowed metric series, the validated system report an entity
//! sends, and the display-ready view record built from both.
//!
//! ## Features
//!
//! - `serde`: JSON/MessagePack/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use fleetwatch_types::{MetricSeries, SeriesBundle};
//!
//! let mut bundle = SeriesBundle::new();
//! bundle.insert("web-1", "cpu", MetricSeries::from_points([(60, Some(12.0)), (0, Some(8.0))]));
//!
//! let cpu = bundle.series_or_empty("web-1", "cpu");
//! assert_eq!(cpu.len(), 2);
//! assert_eq!(cpu.points()[0].timestamp, 0);
//!
//! // Entities without history get an empty series rather than an error
//! assert!(bundle.series_or_empty("db-1", "memory").is_empty());
//! ```

mod report;
mod series;
mod view;

pub use report::*;
pub use series::*;
pub use view::*;

/// Stable identifier of a reporting entity (e.g. a server slug).
pub type EntityId = String;

/// Metric name used for CPU usage series.
pub const CPU_METRIC: &str = "cpu";

/// Metric name used for memory usage series.
pub const MEMORY_METRIC: &str = "memory";
