//! Raw records
//!
//! The typed input model for the four synchronized collections.
//! Records arrive from the document store as loosely-filled documents;
//! every optional field has a defined degraded reading so a partially
//! filled document never aborts a computation pass.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of collections the engine synchronizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Employees,
    Tasks,
    Videos,
    Suggestions,
}

impl Collection {
    /// All collections, in the order sessions open their feeds
    pub const ALL: [Collection; 4] = [
        Collection::Employees,
        Collection::Tasks,
        Collection::Videos,
        Collection::Suggestions,
    ];

    /// Store-side collection name
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Employees => "employees",
            Collection::Tasks => "tasks",
            Collection::Videos => "videos",
            Collection::Suggestions => "suggestions",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque store-assigned document identifier.
///
/// An empty id marks a malformed record: it is excluded from computation
/// and logged, never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One employee's view of a training video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoView {
    pub employee_id: RecordId,

    /// Whether the employee watched the video to the end
    #[serde(default)]
    pub completed: bool,
}

/// A document from one of the synchronized collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    /// An onboarding employee profile
    Employee {
        #[serde(default)]
        id: RecordId,
        #[serde(default)]
        name: String,
        #[serde(default)]
        email: String,
        #[serde(default)]
        role: String,
        /// Missing department reads as "Unassigned" in rollups
        #[serde(default, skip_serializing_if = "Option::is_none")]
        department: Option<String>,
        #[serde(default)]
        is_admin: bool,
        /// Missing hire date excludes the employee from new-hire counts only
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hire_date: Option<NaiveDate>,
        /// Missing last-active timestamp reads as "not recently active"
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_active: Option<DateTime<Utc>>,
        /// Chat identity, when the employee has signed in
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_uid: Option<String>,
    },

    /// An onboarding task, optionally assigned to an employee
    Task {
        #[serde(default)]
        id: RecordId,
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assigned_to: Option<RecordId>,
        #[serde(default)]
        completed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video_link: Option<String>,
    },

    /// A training video with its per-employee view list
    Video {
        #[serde(default)]
        id: RecordId,
        #[serde(default)]
        title: String,
        #[serde(default)]
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default)]
        description: String,
        #[serde(default)]
        views: Vec<VideoView>,
        #[serde(default)]
        likes: Vec<RecordId>,
    },

    /// A free-text improvement suggestion
    Suggestion {
        #[serde(default)]
        id: RecordId,
        #[serde(default)]
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submitted_by: Option<RecordId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        submitted_at: Option<DateTime<Utc>>,
    },
}

impl RawRecord {
    /// Get the store-assigned id of this record
    pub fn id(&self) -> &RecordId {
        match self {
            RawRecord::Employee { id, .. } => id,
            RawRecord::Task { id, .. } => id,
            RawRecord::Video { id, .. } => id,
            RawRecord::Suggestion { id, .. } => id,
        }
    }

    /// Get the collection this record belongs to
    pub fn collection(&self) -> Collection {
        match self {
            RawRecord::Employee { .. } => Collection::Employees,
            RawRecord::Task { .. } => Collection::Tasks,
            RawRecord::Video { .. } => Collection::Videos,
            RawRecord::Suggestion { .. } => Collection::Suggestions,
        }
    }

    /// Get the record kind as a string
    pub fn kind(&self) -> &'static str {
        match self {
            RawRecord::Employee { .. } => "employee",
            RawRecord::Task { .. } => "task",
            RawRecord::Video { .. } => "video",
            RawRecord::Suggestion { .. } => "suggestion",
        }
    }

    /// A record without a store-assigned id is malformed and excluded
    /// from computation.
    pub fn is_well_formed(&self) -> bool {
        !self.id().is_empty()
    }

    /// Replace the record's id (used by stores when minting documents)
    pub fn with_id(mut self, new_id: RecordId) -> Self {
        match &mut self {
            RawRecord::Employee { id, .. } => *id = new_id,
            RawRecord::Task { id, .. } => *id = new_id,
            RawRecord::Video { id, .. } => *id = new_id,
            RawRecord::Suggestion { id, .. } => *id = new_id,
        }
        self
    }
}

/// Equality filter over one record field.
///
/// Mirrors the store's `where field == value` queries. A filter on a field
/// the record does not carry never matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordFilter {
    pub field: String,
    pub value: String,
}

impl RecordFilter {
    /// Build an equality filter
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check whether a record satisfies the filter
    pub fn matches(&self, record: &RawRecord) -> bool {
        let value = self.value.as_str();
        match (record, self.field.as_str()) {
            (RawRecord::Employee { department, .. }, "department") => {
                department.as_deref() == Some(value)
            }
            (RawRecord::Employee { role, .. }, "role") => role == value,
            (RawRecord::Task { assigned_to, .. }, "assigned_to") => {
                assigned_to.as_ref().map(RecordId::as_str) == Some(value)
            }
            (RawRecord::Task { completed, .. }, "completed") => {
                completed.to_string() == value
            }
            (RawRecord::Video { category, .. }, "category") => {
                category.as_deref() == Some(value)
            }
            (RawRecord::Suggestion { submitted_by, .. }, "submitted_by") => {
                submitted_by.as_ref().map(RecordId::as_str) == Some(value)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for RecordFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} == {}", self.field, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serialization() {
        let record = RawRecord::Task {
            id: RecordId::new("t1"),
            title: "Set up laptop".to_string(),
            description: String::new(),
            assigned_to: Some(RecordId::new("e1")),
            completed: true,
            due_date: None,
            video_link: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"task""#));

        let deserialized: RawRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deserialized);
    }

    #[test]
    fn test_partial_document_deserializes_with_defaults() {
        // Only the tag and id present, everything else degraded
        let json = r#"{"kind":"employee","id":"e9"}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();

        match record {
            RawRecord::Employee {
                id,
                department,
                hire_date,
                last_active,
                is_admin,
                ..
            } => {
                assert_eq!(id.as_str(), "e9");
                assert!(department.is_none());
                assert!(hire_date.is_none());
                assert!(last_active.is_none());
                assert!(!is_admin);
            }
            other => panic!("expected employee, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_missing_id_marks_record_malformed() {
        let json = r#"{"kind":"suggestion","body":"More docs"}"#;
        let record: RawRecord = serde_json::from_str(json).unwrap();
        assert!(!record.is_well_formed());
        assert!(record.id().is_empty());
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Employees.as_str(), "employees");
        assert_eq!(Collection::Suggestions.to_string(), "suggestions");
        assert_eq!(Collection::ALL.len(), 4);
    }

    fn task_for(task_id: &str, employee: &str) -> RawRecord {
        RawRecord::Task {
            id: RecordId::new(task_id),
            title: String::new(),
            description: String::new(),
            assigned_to: Some(RecordId::new(employee)),
            completed: false,
            due_date: None,
            video_link: None,
        }
    }

    #[test]
    fn test_filter_matches_assigned_to() {
        let filter = RecordFilter::equals("assigned_to", "e1");

        assert!(filter.matches(&task_for("t1", "e1")));
        assert!(!filter.matches(&task_for("t2", "e2")));
    }

    #[test]
    fn test_filter_on_absent_field_never_matches() {
        let filter = RecordFilter::equals("department", "Engineering");
        let video = RawRecord::Video {
            id: RecordId::new("v1"),
            title: String::new(),
            url: String::new(),
            category: None,
            description: String::new(),
            views: vec![],
            likes: vec![],
        };
        assert!(!filter.matches(&video));

        let unassigned = RawRecord::Employee {
            id: RecordId::new("e1"),
            name: String::new(),
            email: String::new(),
            role: String::new(),
            department: None,
            is_admin: false,
            hire_date: None,
            last_active: None,
            auth_uid: None,
        };
        assert!(!filter.matches(&unassigned));
    }
}
