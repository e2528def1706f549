//! The fleet view service.
//!
//! [`FleetView`] wires the upstream sources, the merge pipeline and a
//! [`RecomputeCache`] together and is what viewers pull from.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetwatch_types::ViewRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{CacheEntry, RecomputeCache};
use crate::clock::{Clock, SystemClock};
use crate::data::{merge, Staleness, VIEW_METRICS};
use crate::error::{Error, Result};
use crate::notify::{NoopNotifier, Session, ViewerNotifier, CHART_UPDATE_EVENT};
use crate::source::{Reducer, SeriesAggregator, SnapshotSource, SYSTEM_KIND};

/// Default recompute interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Default timeout around each upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Records of one recompute, shared by every reader of it.
pub type Entities = Arc<[ViewRecord]>;

/// What the presentation layer receives.
///
/// Cloning shares the entity records rather than copying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPayload {
    pub entities: Entities,
    pub computed_at: DateTime<Utc>,
    pub next_recompute_at: DateTime<Utc>,
    /// How long the recompute took.
    pub took: Duration,
}

impl ViewPayload {
    fn from_entry(entry: &CacheEntry<Entities>) -> Self {
        Self {
            entities: Arc::clone(&entry.payload),
            computed_at: entry.computed_at,
            next_recompute_at: entry.next_recompute_at,
            took: entry.took,
        }
    }

    /// Seconds since the view was computed.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.computed_at).num_seconds()
    }
}

/// Cached, merged view over the whole fleet.
#[derive(Debug)]
pub struct FleetView {
    snapshots: Arc<dyn SnapshotSource>,
    series: Arc<dyn SeriesAggregator>,
    cache: RecomputeCache<Entities>,
    staleness: Staleness,
    upstream_timeout: Duration,
    notifier: Arc<dyn ViewerNotifier>,
    clock: Arc<dyn Clock>,
}

impl FleetView {
    /// Create a new builder from the two upstream sources.
    pub fn builder(
        snapshots: Arc<dyn SnapshotSource>,
        series: Arc<dyn SeriesAggregator>,
    ) -> FleetViewBuilder {
        FleetViewBuilder {
            snapshots,
            series,
            refresh_interval: None,
            staleness: Staleness::disabled(),
            upstream_timeout: None,
            notifier: None,
            clock: None,
            cache: None,
        }
    }

    /// Builder for a source that provides both snapshots and series.
    pub fn from_source<S>(source: Arc<S>) -> FleetViewBuilder
    where
        S: SnapshotSource + SeriesAggregator + 'static,
    {
        Self::builder(source.clone(), source)
    }

    /// The current fleet view, recomputing it if the interval has elapsed.
    ///
    /// Interactive sessions also get the view pushed as a
    /// [`CHART_UPDATE_EVENT`].
    pub async fn view(&self, session: Session) -> Result<ViewPayload> {
        let entry = self.cache.get(|| self.compute()).await?;
        let payload = ViewPayload::from_entry(&entry);

        if session.is_interactive() {
            self.notifier.notify(CHART_UPDATE_EVENT, &payload);
        }
        Ok(payload)
    }

    /// The last successfully computed view, if any.
    pub fn last_good(&self) -> Option<ViewPayload> {
        self.cache.peek().map(|entry| ViewPayload::from_entry(&entry))
    }

    pub fn cache(&self) -> &RecomputeCache<Entities> {
        &self.cache
    }

    pub fn staleness(&self) -> Staleness {
        self.staleness
    }

    /// Description of the snapshot source.
    pub fn description(&self) -> &str {
        self.snapshots.description()
    }

    fn compute(&self) -> impl Future<Output = Result<Entities>> + Send + 'static {
        let snapshots = Arc::clone(&self.snapshots);
        let series = Arc::clone(&self.series);
        let clock = Arc::clone(&self.clock);
        let staleness = self.staleness;
        let limit = self.upstream_timeout;

        async move {
            let (latest, bundle) = tokio::try_join!(
                upstream(limit, snapshots.latest(SYSTEM_KIND)),
                upstream(limit, series.series(&VIEW_METRICS, Reducer::Average)),
            )?;
            debug!(
                "Fetched {} snapshots and series for {} entities",
                latest.len(),
                bundle.len()
            );

            let now = clock.now().timestamp();
            let records = merge(latest.values(), &bundle, staleness, now)?;

            info!(
                "Fleet view: {} of {} entities visible",
                records.len(),
                latest.len()
            );
            Ok(records.into())
        }
    }
}

async fn upstream<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(limit))?
}

/// Builder for [`FleetView`].
#[derive(Debug)]
pub struct FleetViewBuilder {
    snapshots: Arc<dyn SnapshotSource>,
    series: Arc<dyn SeriesAggregator>,
    refresh_interval: Option<Duration>,
    staleness: Staleness,
    upstream_timeout: Option<Duration>,
    notifier: Option<Arc<dyn ViewerNotifier>>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<RecomputeCache<Entities>>,
}

impl FleetViewBuilder {
    /// Set the recompute interval (default: 5 seconds).
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Hide entities that have not reported within the threshold.
    pub fn staleness(mut self, staleness: Staleness) -> Self {
        self.staleness = staleness;
        self
    }

    /// Set the timeout around each upstream call (default: 10 seconds).
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = Some(timeout);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn ViewerNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use an existing cache, e.g. one handed out by a
    /// [`CacheRegistry`](crate::CacheRegistry). Overrides `refresh_interval`.
    pub fn cache(mut self, cache: RecomputeCache<Entities>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the view.
    pub fn build(self) -> FleetView {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = self.cache.unwrap_or_else(|| {
            RecomputeCache::new(
                self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
                Arc::clone(&clock),
            )
        });

        FleetView {
            snapshots: self.snapshots,
            series: self.series,
            cache,
            staleness: self.staleness,
            upstream_timeout: self.upstream_timeout.unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::source::{MemorySource, SnapshotSet};
    use async_trait::async_trait;
    use fleetwatch_types::SeriesBundle;

    const NOW: i64 = 1_700_000_000;

    #[derive(Debug)]
    struct HangingSource;

    #[async_trait]
    impl SnapshotSource for HangingSource {
        async fn latest(&self, _kind: &str) -> Result<SnapshotSet> {
            std::future::pending().await
        }

        fn description(&self) -> &str {
            "hanging"
        }
    }

    #[async_trait]
    impl SeriesAggregator for HangingSource {
        async fn series(&self, _metrics: &[&str], _reducer: Reducer) -> Result<SeriesBundle> {
            Ok(SeriesBundle::new())
        }
    }

    #[test]
    fn test_builder_defaults() {
        let view = FleetView::from_source(Arc::new(MemorySource::new())).build();

        assert_eq!(view.cache().interval(), DEFAULT_REFRESH_INTERVAL);
        assert_eq!(view.upstream_timeout, DEFAULT_UPSTREAM_TIMEOUT);
        assert_eq!(view.staleness(), Staleness::disabled());
        assert_eq!(view.description(), "memory");
        assert!(view.last_good().is_none());
    }

    #[test]
    fn test_builder_prefers_given_cache() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let cache = RecomputeCache::new(Duration::from_secs(42), clock);

        let view = FleetView::from_source(Arc::new(MemorySource::new()))
            .refresh_interval(Duration::from_secs(1))
            .cache(cache)
            .build();

        assert_eq!(view.cache().interval(), Duration::from_secs(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_upstream_times_out() {
        let view = FleetView::from_source(Arc::new(HangingSource))
            .upstream_timeout(Duration::from_secs(2))
            .build();

        let err = view.view(Session::Initial).await.unwrap_err();

        assert!(matches!(err.root(), Error::Timeout(d) if *d == Duration::from_secs(2)));
        assert!(view.last_good().is_none());
    }

    #[tokio::test]
    async fn test_empty_fleet() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let view = FleetView::from_source(Arc::new(MemorySource::new()))
            .clock(clock)
            .build();

        let payload = view.view(Session::Initial).await.unwrap();

        assert!(payload.entities.is_empty());
        assert_eq!(payload.computed_at.timestamp(), NOW);
        assert_eq!(payload.next_recompute_at.timestamp(), NOW + 5);
    }

    #[tokio::test]
    async fn test_readers_share_entity_records() {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let source = Arc::new(MemorySource::new());
        source.record(
            SYSTEM_KIND,
            "a",
            serde_json::json!({
                "name": "A",
                "cpu": 1,
                "memory_used": 1,
                "memory_total": 2,
                "storage": []
            }),
            NOW,
        );
        let view = FleetView::from_source(source).clock(clock).build();

        let first = view.view(Session::Initial).await.unwrap();
        let second = view.view(Session::Initial).await.unwrap();

        assert!(Arc::ptr_eq(&first.entities, &second.entities));
        assert!(Arc::ptr_eq(&first.entities, &view.last_good().unwrap().entities));
        assert_eq!(first.took, view.cache().peek().unwrap().took);
    }

    #[test]
    fn test_payload_serializes_timestamps_as_rfc3339() {
        let computed_at = DateTime::from_timestamp(NOW, 0).unwrap();
        let payload = ViewPayload {
            entities: Vec::<ViewRecord>::new().into(),
            computed_at,
            next_recompute_at: computed_at,
            took: Duration::from_millis(250),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["computed_at"], "2023-11-14T22:13:20Z");
        assert_eq!(json["took"]["nanos"], 250_000_000);
        assert_eq!(payload.age_secs(computed_at + chrono::TimeDelta::seconds(3)), 3);
    }
}
