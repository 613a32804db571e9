//! Document store boundary
//!
//! The engine's single seam to the backing document database. A store
//! pushes whole-collection snapshots and whole-room message logs; the
//! engine never sees per-document deltas.

pub mod error;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::{Message, MessageDraft, RoomKey};
use crate::domain::{Collection, CollectionSnapshot, RawRecord, RecordFilter, RecordId};

pub use error::StoreError;
pub use memory::InMemoryStore;

/// Items pushed by a collection feed.
///
/// Each item is either a full replacement snapshot or the feed's
/// terminal error; nothing follows an `Err`.
pub type SnapshotFeed = mpsc::UnboundedReceiver<Result<Arc<CollectionSnapshot>, StoreError>>;

/// Items pushed by a room feed: the full ordered message log, replaced
/// on every append, or the feed's terminal error.
pub type MessageFeed = mpsc::UnboundedReceiver<Result<Arc<Vec<Message>>, StoreError>>;

/// Push-based document store.
///
/// Feeds deliver the current state immediately on subscribe and a full
/// replacement after every mutation. A feed ends when its receiver is
/// dropped or after the store pushes an error; the store never retries
/// a failed feed on its own.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Open a live feed over one collection, optionally narrowed by an
    /// equality filter.
    async fn subscribe_collection(
        &self,
        collection: Collection,
        filter: Option<RecordFilter>,
    ) -> Result<SnapshotFeed, StoreError>;

    /// Append a record to its collection. The store mints the id when
    /// the record arrives without one; the stored id is returned.
    async fn append_record(&self, record: RawRecord) -> Result<RecordId, StoreError>;

    /// Open a live feed over one chat room's ordered message log.
    async fn subscribe_room(&self, room: &RoomKey) -> Result<MessageFeed, StoreError>;

    /// Append a message to a room. Sequence number and timestamp are
    /// assigned here; the stored message is returned.
    async fn append_message(
        &self,
        room: &RoomKey,
        draft: MessageDraft,
    ) -> Result<Message, StoreError>;
}
