//! Store Errors
//!
//! Error types for document store operations and feeds.

use crate::domain::Collection;

/// Errors that can occur against the document store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store refused to open or continue a collection feed
    #[error("Feed denied for {collection}: {reason}")]
    FeedDenied {
        collection: Collection,
        reason: String,
    },

    /// The store is unreachable or shut down
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The requested chat room no longer accepts reads or writes
    #[error("Room closed: {0}")]
    RoomClosed(String),

    /// A document targeted by a mutation does not exist
    #[error("Document not found in {collection}: {id}")]
    NotFound { collection: Collection, id: String },

    /// A document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Check whether a fresh subscribe could succeed where this feed
    /// failed. Feeds themselves are never retried in place.
    pub fn is_resubscribable(&self) -> bool {
        matches!(
            self,
            StoreError::FeedDenied { .. } | StoreError::Unavailable(_)
        )
    }
}
