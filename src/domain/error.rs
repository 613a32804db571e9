//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

use super::record::Collection;

/// Domain-specific errors
///
/// These errors represent violations of the input model and of chat
/// identity rules. They are independent of the store layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A stored document that cannot participate in computation.
    /// Tolerated: the record is excluded and logged, never fatal.
    #[error("Malformed {collection} record: {reason}")]
    MalformedRecord {
        collection: Collection,
        reason: String,
    },

    /// A chat participant id that would break room identity
    #[error("Invalid chat participant id: {0}")]
    InvalidParticipant(String),
}

impl DomainError {
    /// Create a malformed record error
    pub fn malformed(collection: Collection, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            collection,
            reason: reason.into(),
        }
    }

    /// Check if this failure originates in stored data (tolerated and
    /// logged) rather than in how the caller used the API.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}
