//! Onboardly Engine Library
//!
//! Re-exports modules for integration testing and external use.

pub mod analytics;
pub mod chat;
pub mod domain;
pub mod projection;
pub mod session;
pub mod store;
pub mod subscription;

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use domain::{Collection, DerivedMetrics, RawRecord, RecordFilter, RecordId, SnapshotSet};
pub use session::AnalyticsSession;
pub use store::{DocumentStore, InMemoryStore, StoreError};
pub use subscription::SubscriptionManager;
