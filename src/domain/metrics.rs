//! Derived metrics
//!
//! The read model published to dashboard consumers. Every value here is
//! recomputed from whole-collection snapshots; nothing is updated
//! incrementally, so the struct carries no mutation API.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::record::RecordId;

/// Rollup label for employees without a department
pub const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

/// Activity window for the "recently active" predicate, in days
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;

/// One employee's engagement measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeEngagement {
    pub employee_id: RecordId,
    pub name: String,

    /// Percentage of the employee's assigned tasks that are completed,
    /// 0 when nothing is assigned
    pub task_completion_rate: u32,

    /// Number of distinct videos with at least one view by the employee
    pub videos_watched: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl EmployeeEngagement {
    /// An employee counts as engaged with any task progress or any video
    /// activity.
    pub fn is_engaged(&self) -> bool {
        self.task_completion_rate > 0 || self.videos_watched > 0
    }

    /// Whether the employee was active strictly within the activity
    /// window ending at `now`. A missing timestamp reads as inactive.
    pub fn is_recently_active(&self, now: DateTime<Utc>) -> bool {
        match self.last_active {
            Some(ts) => ts > now - Duration::days(ACTIVITY_WINDOW_DAYS),
            None => false,
        }
    }
}

/// Per-department aggregate over its employees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRollup {
    pub employee_count: u32,

    /// Arithmetic mean of member task-completion rates
    pub avg_completion: u32,

    /// Arithmetic mean of member videos-watched counts
    pub avg_videos_watched: u32,

    /// Percentage of members that are engaged and recently active
    pub engagement_rate: u32,
}

/// One video's place in the popularity ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRanking {
    pub video_id: RecordId,
    pub title: String,
    pub views: u32,
    pub likes: u32,

    /// Percentage of views that watched the video to the end
    pub completion_rate: u32,
}

/// One suggestion text and how often it was submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCount {
    pub body: String,
    pub count: u32,
}

/// The full derived read model for one snapshot set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Completed share of all tasks, 0-100
    pub completion_rate: u32,

    /// Per-employee measures, in employee-snapshot order
    pub engagement: Vec<EmployeeEngagement>,

    /// Department rollups, keyed by department label
    pub departments: BTreeMap<String, DepartmentRollup>,

    /// Videos ranked by view count, descending, input order on ties
    pub videos: Vec<VideoRanking>,

    /// Suggestion texts ranked by frequency, first-seen order on ties
    pub suggestions: Vec<SuggestionCount>,

    /// Employees hired in the calendar month containing `now`
    pub new_hires_this_month: u32,

    /// Employees that count as engaged
    pub engaged_employees: u32,

    /// Engaged share of all employees, 0-100
    pub overall_engagement: u32,
}
