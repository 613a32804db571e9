//! Feed primitives
//!
//! The shared state behind multiplexed collection feeds: one table
//! entry per live (collection, filter) pair, a broadcast channel
//! fanning snapshots out to consumers, and the consumer-side stream
//! and guard halves of a subscription.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::{Collection, CollectionSnapshot, RecordFilter};
use crate::store::StoreError;

/// Identity of one multiplexed feed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub collection: Collection,
    pub filter: Option<RecordFilter>,
}

impl FeedKey {
    pub fn unfiltered(collection: Collection) -> Self {
        Self {
            collection,
            filter: None,
        }
    }

    pub fn filtered(collection: Collection, filter: RecordFilter) -> Self {
        Self {
            collection,
            filter: Some(filter),
        }
    }
}

impl std::fmt::Display for FeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}[{}]", self.collection, filter),
            None => write!(f, "{}", self.collection),
        }
    }
}

/// Items observed by feed consumers
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    /// A full replacement snapshot of the feed's collection
    Snapshot(Arc<CollectionSnapshot>),

    /// Terminal failure. Broadcast at most once per feed; nothing
    /// follows it.
    Failed(Arc<StoreError>),
}

/// One live store feed shared by all consumers of its key
#[derive(Debug)]
struct FeedEntry {
    /// Generation id; stale handles of a replaced feed carry the old one
    feed_id: u64,
    ref_count: usize,
    tx: broadcast::Sender<FeedUpdate>,
    /// Most recent update, for priming late joiners
    latest: Option<FeedUpdate>,
    pump: JoinHandle<()>,
}

/// The table of live feeds, shared between the manager, the pump tasks
/// and every subscription guard.
#[derive(Debug, Default)]
pub(crate) struct FeedTable {
    feeds: HashMap<FeedKey, FeedEntry>,
    next_feed_id: u64,
}

/// Recover the guard even if a holder panicked; the table's state
/// transitions are single assignments and stay consistent.
pub(crate) fn lock_table(table: &Mutex<FeedTable>) -> MutexGuard<'_, FeedTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FeedTable {
    /// Join an existing feed, if one is live for this key.
    ///
    /// Bumps the ref count and returns the pieces of a consumer handle,
    /// primed with the feed's latest update so the joiner never starts
    /// blind.
    pub(crate) fn join(
        &mut self,
        key: &FeedKey,
    ) -> Option<(u64, Option<FeedUpdate>, broadcast::Receiver<FeedUpdate>)> {
        let entry = self.feeds.get_mut(key)?;
        entry.ref_count += 1;
        Some((entry.feed_id, entry.latest.clone(), entry.tx.subscribe()))
    }

    pub(crate) fn mint_feed_id(&mut self) -> u64 {
        self.next_feed_id += 1;
        self.next_feed_id
    }

    /// Install a fresh feed entry with one consumer.
    pub(crate) fn install(
        &mut self,
        key: FeedKey,
        feed_id: u64,
        tx: broadcast::Sender<FeedUpdate>,
        pump: JoinHandle<()>,
    ) {
        self.feeds.insert(
            key,
            FeedEntry {
                feed_id,
                ref_count: 1,
                tx,
                latest: None,
                pump,
            },
        );
    }

    /// Record and fan out a snapshot. Returns `false` when the feed is
    /// gone or superseded, telling the pump to stop.
    pub(crate) fn publish(&mut self, key: &FeedKey, feed_id: u64, update: FeedUpdate) -> bool {
        match self.feeds.get_mut(key) {
            Some(entry) if entry.feed_id == feed_id => {
                entry.latest = Some(update.clone());
                // No live receivers is fine; latest still primes joiners
                let _ = entry.tx.send(update);
                true
            }
            _ => false,
        }
    }

    /// Surface a feed failure exactly once and close the feed. A later
    /// subscribe on the same key opens a fresh feed.
    pub(crate) fn fail(&mut self, key: &FeedKey, feed_id: u64, error: Arc<StoreError>) {
        match self.feeds.get(key) {
            Some(entry) if entry.feed_id == feed_id => {}
            _ => return,
        }
        if let Some(entry) = self.feeds.remove(key) {
            tracing::error!(feed = %key, error = %error, "collection feed failed");
            let _ = entry.tx.send(FeedUpdate::Failed(error));
        }
    }

    /// Drop a feed that ended without an error.
    pub(crate) fn end(&mut self, key: &FeedKey, feed_id: u64) {
        match self.feeds.get(key) {
            Some(entry) if entry.feed_id == feed_id => {}
            _ => return,
        }
        tracing::debug!(feed = %key, "collection feed ended");
        self.feeds.remove(key);
    }

    /// Release one consumer. The last release tears the feed down.
    /// Stale handles (failed or replaced feeds) are no-ops.
    pub(crate) fn release(&mut self, key: &FeedKey, feed_id: u64) {
        let Some(entry) = self.feeds.get_mut(key) else {
            return;
        };
        if entry.feed_id != feed_id {
            return;
        }
        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            if let Some(entry) = self.feeds.remove(key) {
                entry.pump.abort();
                tracing::debug!(feed = %key, "last consumer gone, feed released");
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.feeds.len()
    }
}

/// Consuming half of a subscription
#[derive(Debug)]
pub struct FeedStream {
    key: FeedKey,
    primed: Option<FeedUpdate>,
    rx: broadcast::Receiver<FeedUpdate>,
}

impl FeedStream {
    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Next update, or `None` once the feed is closed.
    ///
    /// A consumer that falls behind the fan-out buffer skips straight
    /// to the oldest retained update; whole-snapshot semantics make the
    /// skipped intermediates disposable.
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        if let Some(update) = self.primed.take() {
            return Some(update);
        }
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(feed = %self.key, skipped, "slow feed consumer, skipping to latest");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Releasing half of a subscription.
///
/// Releasing is synchronous, idempotent and mandatory; dropping the
/// guard releases too.
#[derive(Debug)]
pub struct FeedGuard {
    key: FeedKey,
    feed_id: u64,
    table: Arc<Mutex<FeedTable>>,
    released: bool,
}

impl FeedGuard {
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        lock_table(&self.table).release(&self.key, self.feed_id);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for FeedGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// A consumer's handle on one multiplexed feed
#[derive(Debug)]
pub struct Subscription {
    stream: FeedStream,
    guard: FeedGuard,
}

impl Subscription {
    pub(crate) fn new(
        key: FeedKey,
        feed_id: u64,
        primed: Option<FeedUpdate>,
        rx: broadcast::Receiver<FeedUpdate>,
        table: Arc<Mutex<FeedTable>>,
    ) -> Self {
        Self {
            stream: FeedStream {
                key: key.clone(),
                primed,
                rx,
            },
            guard: FeedGuard {
                key,
                feed_id,
                table,
                released: false,
            },
        }
    }

    pub fn key(&self) -> &FeedKey {
        &self.stream.key
    }

    /// Next update, or `None` once the feed is closed or cancelled
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        if self.guard.released {
            return None;
        }
        self.stream.recv().await
    }

    /// Stop consuming and release the feed reference. Synchronous and
    /// idempotent; dropping the subscription cancels too.
    pub fn cancel(&mut self) {
        self.guard.release();
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_released()
    }

    /// Split into the stream and guard halves, so a driving task can
    /// own the stream while the opener keeps synchronous cancellation.
    pub fn into_parts(self) -> (FeedStream, FeedGuard) {
        (self.stream, self.guard)
    }
}
