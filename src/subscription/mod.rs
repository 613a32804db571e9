//! Subscription module
//!
//! Ref-counted multiplexing of store feeds.

pub mod feed;
pub mod manager;

pub use feed::{FeedGuard, FeedKey, FeedStream, FeedUpdate, Subscription};
pub use manager::{SubscriptionManager, DEFAULT_FEED_CAPACITY};
