//! Common test utilities

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use onboardly_engine::domain::{RawRecord, RecordId, VideoView};
use onboardly_engine::session::Clock;
use onboardly_engine::{DocumentStore, InMemoryStore};

/// Fixed wall clock for deterministic window arithmetic
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

/// Session clock pinned to [`fixed_now`]
pub fn fixed_clock() -> Clock {
    Arc::new(fixed_now)
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn employee(
    id: &str,
    name: &str,
    department: Option<&str>,
    hire_date: Option<NaiveDate>,
    last_active: Option<DateTime<Utc>>,
) -> RawRecord {
    RawRecord::Employee {
        id: RecordId::new(id),
        name: name.to_string(),
        email: format!("{id}@example.com"),
        role: "employee".to_string(),
        department: department.map(str::to_string),
        is_admin: false,
        hire_date,
        last_active,
        auth_uid: None,
    }
}

pub fn task(id: &str, assignee: &str, completed: bool) -> RawRecord {
    RawRecord::Task {
        id: RecordId::new(id),
        title: format!("Task {id}"),
        description: String::new(),
        assigned_to: Some(RecordId::new(assignee)),
        completed,
        due_date: None,
        video_link: None,
    }
}

pub fn video(id: &str, title: &str, views: &[(&str, bool)], likes: &[&str]) -> RawRecord {
    RawRecord::Video {
        id: RecordId::new(id),
        title: title.to_string(),
        url: format!("https://example.com/{id}"),
        category: None,
        description: String::new(),
        views: views
            .iter()
            .map(|(viewer, completed)| VideoView {
                employee_id: RecordId::new(*viewer),
                completed: *completed,
            })
            .collect(),
        likes: likes.iter().map(|id| RecordId::new(*id)).collect(),
    }
}

pub fn suggestion(id: &str, body: &str) -> RawRecord {
    RawRecord::Suggestion {
        id: RecordId::new(id),
        body: body.to_string(),
        submitted_by: None,
        submitted_at: Some(fixed_now()),
    }
}

/// Build a store holding the standard onboarding roster.
///
/// Relative to [`fixed_now`]: e1 and e2 are recently active Engineering
/// members, e1 was hired this month, e3 has no department and went
/// quiet 40 days ago. Tasks sit at 2 of 4 completed.
pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let now = fixed_now();

    let records = [
        employee(
            "e1",
            "Ana",
            Some("Engineering"),
            Some(date(2026, 3, 2)),
            Some(now - Duration::days(1)),
        ),
        employee(
            "e2",
            "Bo",
            Some("Engineering"),
            Some(date(2025, 11, 20)),
            Some(now - Duration::days(2)),
        ),
        employee("e3", "Caro", None, Some(date(2026, 2, 10)), Some(now - Duration::days(40))),
        task("t1", "e1", true),
        task("t2", "e1", false),
        task("t3", "e2", true),
        task("t4", "e3", false),
        video("v1", "Welcome tour", &[("e1", true), ("e2", false)], &["e1", "e2"]),
        video("v2", "Security basics", &[("e1", true)], &[]),
        suggestion("s1", "More pairing sessions"),
        suggestion("s2", "More pairing sessions"),
        suggestion("s3", "Faster laptop setup"),
    ];
    for record in records {
        store
            .append_record(record)
            .await
            .expect("seeding the in-memory store cannot fail");
    }
    store
}
