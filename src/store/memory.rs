//! In-memory document store
//!
//! Reference implementation of [`DocumentStore`] used by tests and the
//! exerciser binary. Records keep insertion order, every mutation bumps
//! the collection revision and pushes a fresh snapshot to each live
//! feed, and room logs assign sequence numbers and clamped timestamps
//! the way the production store does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::chat::{Message, MessageDraft, RoomKey};
use crate::domain::{Collection, CollectionSnapshot, RawRecord, RecordFilter, RecordId};

use super::{DocumentStore, MessageFeed, SnapshotFeed, StoreError};

type SnapshotSender = mpsc::UnboundedSender<Result<Arc<CollectionSnapshot>, StoreError>>;
type MessageSender = mpsc::UnboundedSender<Result<Arc<Vec<Message>>, StoreError>>;

#[derive(Debug)]
struct CollectionFeed {
    filter: Option<RecordFilter>,
    tx: SnapshotSender,
}

#[derive(Debug, Default)]
struct CollectionState {
    records: Vec<RawRecord>,
    revision: u64,
    feeds: Vec<CollectionFeed>,

    /// One-shot subscribe denial, consumed by the next subscriber
    denial: Option<String>,
}

#[derive(Debug, Default)]
struct RoomState {
    messages: Vec<Message>,
    next_seq: u64,
    feeds: Vec<MessageSender>,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<Collection, CollectionState>,
    rooms: HashMap<RoomKey, RoomState>,
}

/// In-memory [`DocumentStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate one record in place and push the new collection state.
    pub async fn update_record(
        &self,
        collection: Collection,
        id: &RecordId,
        mutate: impl FnOnce(&mut RawRecord),
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let col = state.collections.entry(collection).or_default();

        let record = col
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        mutate(record);

        col.revision += 1;
        Self::push_collection(collection, col);
        Ok(())
    }

    /// Remove one record and push the new collection state.
    pub async fn delete_record(
        &self,
        collection: Collection,
        id: &RecordId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let col = state.collections.entry(collection).or_default();

        let before = col.records.len();
        col.records.retain(|r| r.id() != id);
        if col.records.len() == before {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }

        col.revision += 1;
        Self::push_collection(collection, col);
        Ok(())
    }

    /// Push a terminal error to every live feed of a collection and
    /// close them. A later subscribe opens a fresh feed.
    pub async fn fail_collection(&self, collection: Collection, error: StoreError) {
        let mut state = self.state.lock().await;
        let col = state.collections.entry(collection).or_default();

        tracing::warn!(
            collection = %collection,
            feeds = col.feeds.len(),
            error = %error,
            "failing collection feeds"
        );
        for feed in col.feeds.drain(..) {
            let _ = feed.tx.send(Err(error.clone()));
        }
    }

    /// Push a terminal error to every live feed of a room and close them.
    pub async fn fail_room(&self, room: &RoomKey, error: StoreError) {
        let mut state = self.state.lock().await;
        if let Some(room_state) = state.rooms.get_mut(room) {
            for tx in room_state.feeds.drain(..) {
                let _ = tx.send(Err(error.clone()));
            }
        }
    }

    /// Make the next `subscribe_collection` on this collection fail.
    pub async fn deny_next_subscribe(&self, collection: Collection, reason: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.collections.entry(collection).or_default().denial = Some(reason.into());
    }

    /// Number of live feeds on a collection, after pruning closed ones.
    pub async fn open_feeds(&self, collection: Collection) -> usize {
        let mut state = self.state.lock().await;
        let col = state.collections.entry(collection).or_default();
        col.feeds.retain(|feed| !feed.tx.is_closed());
        col.feeds.len()
    }

    /// Number of live feeds on a room, after pruning closed ones.
    pub async fn open_room_feeds(&self, room: &RoomKey) -> usize {
        let mut state = self.state.lock().await;
        match state.rooms.get_mut(room) {
            Some(room_state) => {
                room_state.feeds.retain(|tx| !tx.is_closed());
                room_state.feeds.len()
            }
            None => 0,
        }
    }

    /// Filtered view of a collection at its current revision
    fn view(
        collection: Collection,
        revision: u64,
        records: &[RawRecord],
        filter: Option<&RecordFilter>,
    ) -> Arc<CollectionSnapshot> {
        let visible = match filter {
            Some(f) => records.iter().filter(|r| f.matches(r)).cloned().collect(),
            None => records.to_vec(),
        };
        Arc::new(CollectionSnapshot::new(
            collection,
            revision,
            Utc::now(),
            visible,
        ))
    }

    /// Push the current state to every live feed, dropping closed ones
    fn push_collection(collection: Collection, col: &mut CollectionState) {
        let records = &col.records;
        let revision = col.revision;
        col.feeds.retain(|feed| {
            let snapshot = Self::view(collection, revision, records, feed.filter.as_ref());
            feed.tx.send(Ok(snapshot)).is_ok()
        });
    }

    fn push_room(room_state: &mut RoomState) {
        let log = Arc::new(room_state.messages.clone());
        room_state.feeds.retain(|tx| tx.send(Ok(log.clone())).is_ok());
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn subscribe_collection(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> Result<SnapshotFeed, StoreError> {
        let mut state = self.state.lock().await;
        let col = state.collections.entry(collection).or_default();

        if let Some(reason) = col.denial.take() {
            return Err(StoreError::FeedDenied { collection, reason });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let initial = Self::view(collection, col.revision, &col.records, filter.as_ref());
        let _ = tx.send(Ok(initial));
        col.feeds.push(CollectionFeed { filter, tx });

        tracing::debug!(collection = %collection, feeds = col.feeds.len(), "collection feed opened");
        Ok(rx)
    }

    async fn append_record(&self, record: RawRecord) -> Result<RecordId, StoreError> {
        let mut state = self.state.lock().await;
        let collection = record.collection();
        let col = state.collections.entry(collection).or_default();

        let id = if record.id().is_empty() {
            RecordId::new(Uuid::new_v4().to_string())
        } else {
            record.id().clone()
        };
        col.records.push(record.with_id(id.clone()));
        col.revision += 1;
        Self::push_collection(collection, col);

        Ok(id)
    }

    async fn subscribe_room(&self, room: &RoomKey) -> Result<MessageFeed, StoreError> {
        let mut state = self.state.lock().await;
        let room_state = state.rooms.entry(room.clone()).or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Ok(Arc::new(room_state.messages.clone())));
        room_state.feeds.push(tx);

        tracing::debug!(room = %room, "room feed opened");
        Ok(rx)
    }

    async fn append_message(
        &self,
        room: &RoomKey,
        draft: MessageDraft,
    ) -> Result<Message, StoreError> {
        let mut state = self.state.lock().await;
        let room_state = state.rooms.entry(room.clone()).or_default();

        // Timestamps never run backwards within a room, even if the
        // wall clock does
        let now = Utc::now();
        let created_at = match room_state.messages.last() {
            Some(prev) if prev.created_at > now => prev.created_at,
            _ => now,
        };
        room_state.next_seq += 1;

        let message = Message {
            id: Uuid::new_v4(),
            room: room.clone(),
            sender: draft.sender,
            sender_name: draft.sender_name,
            body: draft.body,
            seq: room_state.next_seq,
            created_at,
        };
        room_state.messages.push(message.clone());
        Self::push_room(room_state);

        Ok(message)
    }
}
