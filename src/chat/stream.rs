//! Room streams
//!
//! A room session is one participant's live view of a single room: the
//! full ordered log on open, a new full log after every append, and a
//! terminal failure if the room feed breaks. The chat session layers
//! the one-room-at-a-time rule on top, detaching the previous room
//! before attaching the next.

use std::sync::Arc;

use crate::chat::{Message, MessageDraft, ParticipantId, RoomKey};
use crate::store::{DocumentStore, MessageFeed, StoreError};

/// One delivery on a room feed
#[derive(Debug, Clone)]
pub enum RoomUpdate {
    /// Full ordered message log for the room
    Messages(Arc<Vec<Message>>),
    /// The room feed failed; no further deliveries follow
    Failed(Arc<StoreError>),
}

/// A live attachment to a single room
pub struct RoomSession {
    store: Arc<dyn DocumentStore>,
    room: RoomKey,
    feed: Option<MessageFeed>,
}

impl RoomSession {
    /// Attach to a room. The first delivery is the room's current log,
    /// empty for a room nobody has written to.
    pub async fn open(store: Arc<dyn DocumentStore>, room: RoomKey) -> Result<Self, StoreError> {
        let feed = store.subscribe_room(&room).await?;
        tracing::debug!(room = %room, "room session opened");
        Ok(Self {
            store,
            room,
            feed: Some(feed),
        })
    }

    pub fn room(&self) -> &RoomKey {
        &self.room
    }

    /// Next delivery, or `None` once detached or the feed has ended
    pub async fn recv(&mut self) -> Option<RoomUpdate> {
        let feed = self.feed.as_mut()?;
        match feed.recv().await {
            Some(Ok(messages)) => Some(RoomUpdate::Messages(messages)),
            Some(Err(error)) => {
                tracing::error!(room = %self.room, error = %error, "room feed failed");
                self.feed = None;
                Some(RoomUpdate::Failed(Arc::new(error)))
            }
            None => {
                self.feed = None;
                None
            }
        }
    }

    /// Append a message to the room. Whitespace-only bodies are
    /// dropped without storing anything and return `Ok(None)`. The
    /// stored message comes back for confirmation, but the feed is the
    /// source of truth for ordering.
    pub async fn send(&self, draft: MessageDraft) -> Result<Option<Message>, StoreError> {
        let body = draft.body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        let draft = MessageDraft {
            body: body.to_string(),
            ..draft
        };
        let message = self.store.append_message(&self.room, draft).await?;
        Ok(Some(message))
    }

    /// Stop listening. Synchronous and idempotent; dropping the
    /// session detaches too.
    pub fn detach(&mut self) {
        if self.feed.take().is_some() {
            tracing::debug!(room = %self.room, "room session detached");
        }
    }

    pub fn is_detached(&self) -> bool {
        self.feed.is_none()
    }
}

/// One participant's chat state: at most one attached room at a time
pub struct ChatSession {
    store: Arc<dyn DocumentStore>,
    participant: ParticipantId,
    room: Option<RoomSession>,
}

impl ChatSession {
    pub fn new(store: Arc<dyn DocumentStore>, participant: ParticipantId) -> Self {
        Self {
            store,
            participant,
            room: None,
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// The currently attached room session, if any
    pub fn room(&self) -> Option<&RoomSession> {
        self.room.as_ref()
    }

    pub fn room_mut(&mut self) -> Option<&mut RoomSession> {
        self.room.as_mut()
    }

    /// Attach to the shared room, detaching any previous room first
    pub async fn join_general(&mut self) -> Result<&mut RoomSession, StoreError> {
        self.switch_to(RoomKey::general()).await
    }

    /// Attach to the direct room with `other`, detaching any previous
    /// room first. Both participants land in the same room regardless
    /// of who initiates.
    pub async fn join_direct(&mut self, other: &ParticipantId) -> Result<&mut RoomSession, StoreError> {
        self.switch_to(RoomKey::direct(&self.participant, other)).await
    }

    async fn switch_to(&mut self, room: RoomKey) -> Result<&mut RoomSession, StoreError> {
        // Detach before attaching so two feeds never interleave
        if let Some(mut previous) = self.room.take() {
            previous.detach();
        }
        let session = RoomSession::open(Arc::clone(&self.store), room).await?;
        Ok(self.room.insert(session))
    }

    /// Detach from the current room, if any
    pub fn leave(&mut self) {
        if let Some(mut session) = self.room.take() {
            session.detach();
        }
    }
}
