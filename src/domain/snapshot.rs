//! Collection snapshots
//!
//! Whole-collection states delivered by store feeds. A snapshot is
//! immutable once published and always handed around behind an `Arc`,
//! so change detection is pointer and revision comparison, never a
//! record-by-record diff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{Collection, RawRecord};

/// One full state of one collection, as delivered by a feed.
///
/// `revision` is store-assigned and strictly increasing per feed;
/// a re-delivered identical state carries the same revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    collection: Collection,
    revision: u64,
    observed_at: DateTime<Utc>,
    records: Vec<RawRecord>,
}

impl CollectionSnapshot {
    pub fn new(
        collection: Collection,
        revision: u64,
        observed_at: DateTime<Utc>,
        records: Vec<RawRecord>,
    ) -> Self {
        Self {
            collection,
            revision,
            observed_at,
            records,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The latest known snapshot of each collection.
///
/// This is the sole input of the metrics fold. Collections that have not
/// delivered yet read as empty.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    employees: Option<Arc<CollectionSnapshot>>,
    tasks: Option<Arc<CollectionSnapshot>>,
    videos: Option<Arc<CollectionSnapshot>>,
    suggestions: Option<Arc<CollectionSnapshot>>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an incoming snapshot.
    ///
    /// Returns `true` when the set actually changed. A pointer-identical
    /// snapshot, a re-delivered revision, or a stale (lower) revision
    /// leaves the set untouched and returns `false`.
    pub fn merge(&mut self, snapshot: Arc<CollectionSnapshot>) -> bool {
        let slot = self.slot_mut(snapshot.collection());
        if let Some(current) = slot {
            if Arc::ptr_eq(current, &snapshot) || current.revision() >= snapshot.revision() {
                return false;
            }
        }
        *slot = Some(snapshot);
        true
    }

    pub fn get(&self, collection: Collection) -> Option<&Arc<CollectionSnapshot>> {
        self.slot(collection).as_ref()
    }

    /// Records of a collection; empty when it has not delivered yet
    pub fn records(&self, collection: Collection) -> &[RawRecord] {
        match self.slot(collection) {
            Some(snapshot) => snapshot.records(),
            None => &[],
        }
    }

    /// Whether every collection has delivered at least once
    pub fn is_complete(&self) -> bool {
        Collection::ALL.iter().all(|c| self.slot(*c).is_some())
    }

    fn slot(&self, collection: Collection) -> &Option<Arc<CollectionSnapshot>> {
        match collection {
            Collection::Employees => &self.employees,
            Collection::Tasks => &self.tasks,
            Collection::Videos => &self.videos,
            Collection::Suggestions => &self.suggestions,
        }
    }

    fn slot_mut(&mut self, collection: Collection) -> &mut Option<Arc<CollectionSnapshot>> {
        match collection {
            Collection::Employees => &mut self.employees,
            Collection::Tasks => &mut self.tasks,
            Collection::Videos => &mut self.videos,
            Collection::Suggestions => &mut self.suggestions,
        }
    }
}
