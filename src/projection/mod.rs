//! Projection module
//!
//! Maintains the derived read model from collection snapshots.
//! The projection is optimized for readers and recomputed only when
//! its inputs actually change.

mod service;

pub use service::{MetricsProjection, DEFAULT_METRICS_CAPACITY};
