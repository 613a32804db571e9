//! Subscription manager
//!
//! Multiplexes consumer subscriptions onto store feeds: at most one
//! store feed is live per distinct (collection, filter) pair, shared by
//! every consumer of that pair through a broadcast channel. A feed that
//! fails surfaces its error to every consumer exactly once and closes;
//! nothing here retries, a later subscribe simply opens a fresh feed.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::domain::{Collection, RecordFilter};
use crate::error::EngineResult;
use crate::store::{DocumentStore, SnapshotFeed};

use super::feed::{lock_table, FeedKey, FeedTable, FeedUpdate, Subscription};

/// Fan-out buffer per feed; a consumer further behind than this skips
/// ahead to the oldest retained snapshot
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Ref-counted multiplexer of collection feeds
pub struct SubscriptionManager {
    store: Arc<dyn DocumentStore>,
    table: Arc<Mutex<FeedTable>>,
    capacity: usize,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_capacity(store, DEFAULT_FEED_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn DocumentStore>, capacity: usize) -> Self {
        Self {
            store,
            table: Arc::new(Mutex::new(FeedTable::default())),
            capacity,
        }
    }

    /// Subscribe to a collection, optionally narrowed by a filter.
    ///
    /// Joins the live feed for this key when one exists; otherwise
    /// opens one store feed and installs it for sharing. Late joiners
    /// are primed with the feed's latest snapshot.
    pub async fn subscribe(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> EngineResult<Subscription> {
        let key = FeedKey { collection, filter };

        if let Some(subscription) = self.try_join(&key) {
            return Ok(subscription);
        }

        // Open the store feed outside the lock; subscribing can be slow
        let store_feed = self
            .store
            .subscribe_collection(key.collection, key.filter.clone())
            .await?;

        let mut table = lock_table(&self.table);
        // A concurrent subscriber may have installed the feed meanwhile;
        // join it and let the extra store feed close on drop
        if let Some((feed_id, primed, rx)) = table.join(&key) {
            return Ok(Subscription::new(
                key,
                feed_id,
                primed,
                rx,
                Arc::clone(&self.table),
            ));
        }

        let (tx, rx) = broadcast::channel(self.capacity);
        let feed_id = table.mint_feed_id();
        let pump = tokio::spawn(pump_feed(
            key.clone(),
            feed_id,
            store_feed,
            Arc::clone(&self.table),
        ));
        table.install(key.clone(), feed_id, tx, pump);

        tracing::debug!(feed = %key, feed_id, "store feed opened");
        Ok(Subscription::new(
            key,
            feed_id,
            None,
            rx,
            Arc::clone(&self.table),
        ))
    }

    fn try_join(&self, key: &FeedKey) -> Option<Subscription> {
        let mut table = lock_table(&self.table);
        let (feed_id, primed, rx) = table.join(key)?;
        Some(Subscription::new(
            key.clone(),
            feed_id,
            primed,
            rx,
            Arc::clone(&self.table),
        ))
    }

    /// Number of live store feeds across all keys
    pub fn open_feed_count(&self) -> usize {
        lock_table(&self.table).len()
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("open_feeds", &self.open_feed_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Forward one store feed into the shared table until it ends, fails,
/// or loses its last consumer.
async fn pump_feed(
    key: FeedKey,
    feed_id: u64,
    mut store_feed: SnapshotFeed,
    table: Arc<Mutex<FeedTable>>,
) {
    loop {
        match store_feed.recv().await {
            Some(Ok(snapshot)) => {
                let update = FeedUpdate::Snapshot(snapshot);
                if !lock_table(&table).publish(&key, feed_id, update) {
                    return;
                }
            }
            Some(Err(error)) => {
                lock_table(&table).fail(&key, feed_id, Arc::new(error));
                return;
            }
            None => {
                lock_table(&table).end(&key, feed_id);
                return;
            }
        }
    }
}
