//! Chat messages
//!
//! Message documents and the client-supplied draft they are built from.
//! Sequence numbers and timestamps are assigned by the store at append,
//! never by the sender.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::room::{ParticipantId, RoomKey};

/// A stored chat message.
///
/// `seq` strictly increases within a room and is the room's total
/// order; `created_at` is non-decreasing within a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room: RoomKey,
    pub sender: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub body: String,
    pub seq: u64,
    pub created_at: DateTime<Utc>,
}

/// The client-supplied part of a message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub sender: ParticipantId,
    pub sender_name: Option<String>,
    pub body: String,
}

impl MessageDraft {
    pub fn new(sender: ParticipantId, body: impl Into<String>) -> Self {
        Self {
            sender,
            sender_name: None,
            body: body.into(),
        }
    }

    /// Attach the sender's display name
    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }
}
