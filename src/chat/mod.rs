//! Team chat
//!
//! Room identity, message documents, and live room streams. Rooms are
//! append-only logs; every delivery carries the full ordered log so a
//! late joiner and a long-time listener always agree.

mod message;
mod room;
mod stream;

pub use message::{Message, MessageDraft};
pub use room::{ParticipantId, RoomKey, GENERAL_ROOM};
pub use stream::{ChatSession, RoomSession, RoomUpdate};
