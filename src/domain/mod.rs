//! Domain module
//!
//! Core domain types: the typed input model, snapshot containers, and
//! the derived read model.

pub mod error;
pub mod metrics;
pub mod record;
pub mod snapshot;

pub use error::DomainError;
pub use metrics::{
    DepartmentRollup, DerivedMetrics, EmployeeEngagement, SuggestionCount, VideoRanking,
    ACTIVITY_WINDOW_DAYS, UNASSIGNED_DEPARTMENT,
};
pub use record::{Collection, RawRecord, RecordFilter, RecordId, VideoView};
pub use snapshot::{CollectionSnapshot, SnapshotSet};
