//! Room identity
//!
//! Deterministic chat room keys. Any two participants resolve to the
//! same direct-room key regardless of argument order, and the shared
//! room lives in its own namespace, so a key is derivable from
//! identities alone with no room directory lookup.

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Key of the room every participant can read and write
pub const GENERAL_ROOM: &str = "general";

/// Namespace prefix for direct rooms
const DIRECT_PREFIX: &str = "dm_";

/// Separator between the two participant ids in a direct-room key
const KEY_SEPARATOR: char = '_';

/// A validated chat participant identity.
///
/// # Invariants
/// - Never empty
/// - Never contains the key separator, which keeps direct-room keys
///   injective over unordered participant pairs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a participant id with validation.
    ///
    /// # Errors
    /// `DomainError::InvalidParticipant` when the id is empty or
    /// contains `'_'`.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidParticipant(
                "empty participant id".to_string(),
            ));
        }
        if id.contains(KEY_SEPARATOR) {
            return Err(DomainError::InvalidParticipant(format!(
                "{id:?} contains the room key separator"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ParticipantId::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

/// Resolved identity of a chat room.
///
/// Either the shared room or a direct room between two participants.
/// Direct keys sort the pair, so `direct(a, b) == direct(b, a)`, and
/// the `dm_` prefix keeps them out of the shared room's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomKey(String);

impl RoomKey {
    /// The shared room
    pub fn general() -> Self {
        Self(GENERAL_ROOM.to_string())
    }

    /// The direct room between two participants, order-independent
    pub fn direct(a: &ParticipantId, b: &ParticipantId) -> Self {
        let (lo, hi) = if a.as_str() <= b.as_str() { (a, b) } else { (b, a) };
        Self(format!(
            "{DIRECT_PREFIX}{}{KEY_SEPARATOR}{}",
            lo.as_str(),
            hi.as_str()
        ))
    }

    pub fn is_direct(&self) -> bool {
        self.0.starts_with(DIRECT_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
