//! Windowed metric series produced by an aggregator.

use std::collections::BTreeMap;

use crate::EntityId;

/// A single bucket of a windowed series.
///
/// `value` is `None` for buckets where the entity reported nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "(i64, Option<f64>)", into = "(i64, Option<f64>)")
)]
pub struct SeriesPoint {
    /// Bucket start, Unix seconds.
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl From<(i64, Option<f64>)> for SeriesPoint {
    fn from((timestamp, value): (i64, Option<f64>)) -> Self {
        Self { timestamp, value }
    }
}

impl From<SeriesPoint> for (i64, Option<f64>) {
    fn from(point: SeriesPoint) -> Self {
        (point.timestamp, point.value)
    }
}

/// Time-ascending sequence of series points for one metric of one entity.
///
/// The ascending order is maintained by every constructor and by [`push`],
/// so consumers can rely on `points()` being sorted by timestamp.
///
/// [`push`]: MetricSeries::push
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Vec<SeriesPoint>", into = "Vec<SeriesPoint>")
)]
pub struct MetricSeries {
    points: Vec<SeriesPoint>,
}

impl MetricSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from points in any order.
    ///
    /// Points are sorted by timestamp; points sharing a timestamp keep their
    /// relative order.
    pub fn from_points<I, P>(points: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<SeriesPoint>,
    {
        let mut points: Vec<SeriesPoint> = points.into_iter().map(Into::into).collect();
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    /// Insert a point, keeping the series time-ascending.
    pub fn push(&mut self, timestamp: i64, value: Option<f64>) {
        let idx = self.points.partition_point(|p| p.timestamp <= timestamp);
        self.points.insert(idx, SeriesPoint { timestamp, value });
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The most recent bucket that carries a value.
    pub fn latest_value(&self) -> Option<f64> {
        self.points.iter().rev().find_map(|p| p.value)
    }
}

impl From<Vec<SeriesPoint>> for MetricSeries {
    fn from(points: Vec<SeriesPoint>) -> Self {
        Self::from_points(points)
    }
}

impl From<MetricSeries> for Vec<SeriesPoint> {
    fn from(series: MetricSeries) -> Self {
        series.points
    }
}

/// Windowed series for many entities: `entity -> metric -> series`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SeriesBundle {
    entities: BTreeMap<EntityId, BTreeMap<String, MetricSeries>>,
}

impl SeriesBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the series for one metric of one entity.
    pub fn insert(
        &mut self,
        entity: impl Into<EntityId>,
        metric: impl Into<String>,
        series: MetricSeries,
    ) {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(metric.into(), series);
    }

    pub fn get(&self, entity: &str, metric: &str) -> Option<&MetricSeries> {
        self.entities.get(entity)?.get(metric)
    }

    /// The series for `entity`/`metric`, or an empty one when absent.
    ///
    /// A newly reporting entity has no history yet, so a missing series is
    /// not an error.
    pub fn series_or_empty(&self, entity: &str, metric: &str) -> MetricSeries {
        self.get(entity, metric).cloned().unwrap_or_default()
    }

    /// Restrict the bundle to the given metric names.
    pub fn retain_metrics(&mut self, metrics: &[&str]) {
        for series in self.entities.values_mut() {
            series.retain(|name, _| metrics.contains(&name.as_str()));
        }
        self.entities.retain(|_, series| !series.is_empty());
    }

    /// Number of entities with at least one series.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }
}
