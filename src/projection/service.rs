//! Projection Service
//!
//! Maintains the derived read model over the latest collection
//! snapshots. Apply is cheap for re-deliveries: when the tracked
//! snapshot set does not change, nothing is recomputed and nothing is
//! published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::analytics::compute_derived_metrics;
use crate::domain::{CollectionSnapshot, DerivedMetrics, SnapshotSet};

/// Fan-out buffer for published metrics
pub const DEFAULT_METRICS_CAPACITY: usize = 16;

/// Derived-view cache and publisher.
///
/// Driven from a single task; the struct itself is not shared.
#[derive(Debug)]
pub struct MetricsProjection {
    snapshots: SnapshotSet,
    latest: Option<Arc<DerivedMetrics>>,
    tx: broadcast::Sender<Arc<DerivedMetrics>>,
}

impl MetricsProjection {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            snapshots: SnapshotSet::new(),
            latest: None,
            tx,
        }
    }

    /// Apply one incoming snapshot.
    ///
    /// Recomputes and publishes only when the snapshot actually changes
    /// the tracked set; a pointer-identical or same-revision delivery
    /// returns `None` without touching the cached metrics.
    pub fn apply(
        &mut self,
        snapshot: Arc<CollectionSnapshot>,
        now: DateTime<Utc>,
    ) -> Option<Arc<DerivedMetrics>> {
        let collection = snapshot.collection();
        let revision = snapshot.revision();

        if !self.snapshots.merge(snapshot) {
            tracing::debug!(
                collection = %collection,
                revision,
                "unchanged snapshot, keeping cached metrics"
            );
            return None;
        }

        let metrics = Arc::new(compute_derived_metrics(&self.snapshots, now));
        self.latest = Some(Arc::clone(&metrics));
        let _ = self.tx.send(Arc::clone(&metrics));

        tracing::debug!(
            collection = %collection,
            revision,
            engaged = metrics.engaged_employees,
            completion = metrics.completion_rate,
            "derived metrics recomputed"
        );
        Some(metrics)
    }

    /// Most recently published metrics, retained after feeds close
    pub fn latest(&self) -> Option<Arc<DerivedMetrics>> {
        self.latest.clone()
    }

    /// Whether every collection has delivered at least once
    pub fn is_primed(&self) -> bool {
        self.snapshots.is_complete()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DerivedMetrics>> {
        self.tx.subscribe()
    }

    /// Sender handle for minting receivers after the projection moves
    /// into its driving task
    pub fn publisher(&self) -> broadcast::Sender<Arc<DerivedMetrics>> {
        self.tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, RawRecord, RecordId};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    fn tasks_snapshot(revision: u64, completed: bool) -> Arc<CollectionSnapshot> {
        Arc::new(CollectionSnapshot::new(
            Collection::Tasks,
            revision,
            fixed_now(),
            vec![RawRecord::Task {
                id: RecordId::new("t1"),
                title: String::new(),
                description: String::new(),
                assigned_to: None,
                completed,
                due_date: None,
                video_link: None,
            }],
        ))
    }

    #[test]
    fn test_apply_computes_and_publishes() {
        let mut projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);
        let mut feed = projection.subscribe();

        let metrics = projection.apply(tasks_snapshot(1, false), fixed_now()).unwrap();
        assert_eq!(metrics.completion_rate, 0);

        let published = feed.try_recv().unwrap();
        assert!(Arc::ptr_eq(&metrics, &published));
        assert!(Arc::ptr_eq(&metrics, &projection.latest().unwrap()));
    }

    #[test]
    fn test_redelivered_snapshot_skips_recompute() {
        let mut projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);

        let snapshot = tasks_snapshot(1, false);
        let first = projection.apply(snapshot.clone(), fixed_now()).unwrap();

        // Same Arc, then same revision through a fresh allocation
        assert!(projection.apply(snapshot, fixed_now()).is_none());
        assert!(projection.apply(tasks_snapshot(1, true), fixed_now()).is_none());

        assert!(Arc::ptr_eq(&first, &projection.latest().unwrap()));
    }

    #[test]
    fn test_changed_revision_recomputes() {
        let mut projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);

        let first = projection.apply(tasks_snapshot(1, false), fixed_now()).unwrap();
        assert_eq!(first.completion_rate, 0);

        let second = projection.apply(tasks_snapshot(2, true), fixed_now()).unwrap();
        assert_eq!(second.completion_rate, 100);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_primed_after_all_collections() {
        let mut projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);
        assert!(!projection.is_primed());

        for collection in Collection::ALL {
            let snapshot = Arc::new(CollectionSnapshot::new(collection, 1, fixed_now(), vec![]));
            projection.apply(snapshot, fixed_now());
        }
        assert!(projection.is_primed());
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let mut projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);
        assert!(projection.apply(tasks_snapshot(1, false), fixed_now()).is_some());
    }
}
