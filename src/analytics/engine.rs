//! Metrics computation
//!
//! The fold from collection snapshots to the derived read model. The
//! fold is pure: two calls with the same snapshot set and the same
//! `now` produce identical results, including serialized form. Clock
//! time is injected by the caller and never read here.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::domain::{
    Collection, DepartmentRollup, DerivedMetrics, EmployeeEngagement, RawRecord, RecordId,
    SnapshotSet, SuggestionCount, VideoRanking, UNASSIGNED_DEPARTMENT,
};

/// Compute the full derived read model for one snapshot set.
///
/// Collections that have not delivered yet read as empty. Records
/// without an id are excluded and logged; one bad record never aborts
/// the pass.
pub fn compute_derived_metrics(snapshots: &SnapshotSet, now: DateTime<Utc>) -> DerivedMetrics {
    let employees = well_formed(snapshots, Collection::Employees);
    let tasks = well_formed(snapshots, Collection::Tasks);
    let videos = well_formed(snapshots, Collection::Videos);
    let suggestions = well_formed(snapshots, Collection::Suggestions);

    let engagement = employee_engagement(&employees, &tasks, &videos);
    let departments = department_rollups(&employees, &engagement, now);
    let engaged_employees = engagement.iter().filter(|e| e.is_engaged()).count();

    DerivedMetrics {
        completion_rate: global_completion_rate(&tasks),
        overall_engagement: pct(engaged_employees, engagement.len()),
        engaged_employees: engaged_employees as u32,
        new_hires_this_month: new_hires(&employees, now),
        videos: video_rankings(&videos),
        suggestions: suggestion_counts(&suggestions),
        departments,
        engagement,
    }
}

// =========================================================================
// Record intake
// =========================================================================

/// Keep the records that can participate in computation.
///
/// Excluded records are logged with their position so the offending
/// document can be found in the store.
fn well_formed<'a>(snapshots: &'a SnapshotSet, collection: Collection) -> Vec<&'a RawRecord> {
    let mut kept = Vec::new();
    for (position, record) in snapshots.records(collection).iter().enumerate() {
        if !record.is_well_formed() {
            tracing::warn!(
                collection = %collection,
                position,
                "excluding record without id"
            );
            continue;
        }
        if record.collection() != collection {
            tracing::warn!(
                collection = %collection,
                kind = record.kind(),
                position,
                "excluding record of foreign kind"
            );
            continue;
        }
        kept.push(record);
    }
    kept
}

// =========================================================================
// Ratio helpers
// =========================================================================

/// Integer division rounded half-up. Zero denominator reads as zero.
fn rounded_div(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((2 * numerator + denominator) / (2 * denominator)) as u32
}

/// `part` of `whole` as a 0-100 percentage, rounded half-up
fn pct(part: usize, whole: usize) -> u32 {
    rounded_div(100 * part as u64, whole as u64)
}

// =========================================================================
// Per-employee engagement
// =========================================================================

/// One engagement entry per employee, preserving snapshot order
fn employee_engagement(
    employees: &[&RawRecord],
    tasks: &[&RawRecord],
    videos: &[&RawRecord],
) -> Vec<EmployeeEngagement> {
    employees
        .iter()
        .filter_map(|record| {
            let RawRecord::Employee {
                id,
                name,
                last_active,
                ..
            } = record
            else {
                return None;
            };

            let (total, completed) = task_counts(tasks, id);
            let videos_watched = videos
                .iter()
                .filter(|v| video_viewed_by(v, id))
                .count();

            Some(EmployeeEngagement {
                employee_id: id.clone(),
                name: name.clone(),
                task_completion_rate: pct(completed, total),
                videos_watched: videos_watched as u32,
                last_active: *last_active,
            })
        })
        .collect()
}

/// (assigned, completed) task counts for one employee
fn task_counts(tasks: &[&RawRecord], employee: &RecordId) -> (usize, usize) {
    let mut total = 0;
    let mut completed = 0;
    for task in tasks {
        if let RawRecord::Task {
            assigned_to: Some(assignee),
            completed: done,
            ..
        } = task
        {
            if assignee == employee {
                total += 1;
                if *done {
                    completed += 1;
                }
            }
        }
    }
    (total, completed)
}

/// Whether a video's view list references the employee at least once
fn video_viewed_by(record: &RawRecord, employee: &RecordId) -> bool {
    match record {
        RawRecord::Video { views, .. } => views.iter().any(|v| &v.employee_id == employee),
        _ => false,
    }
}

// =========================================================================
// Department rollups
// =========================================================================

#[derive(Default)]
struct DepartmentAccumulator {
    count: u64,
    completion_sum: u64,
    videos_sum: u64,
    active: u64,
}

/// Group employees by department label and average their measures.
///
/// `engagement` must hold one entry per employee in the same order,
/// which `employee_engagement` guarantees.
fn department_rollups(
    employees: &[&RawRecord],
    engagement: &[EmployeeEngagement],
    now: DateTime<Utc>,
) -> BTreeMap<String, DepartmentRollup> {
    let mut accumulators: BTreeMap<String, DepartmentAccumulator> = BTreeMap::new();

    for (record, measures) in employees.iter().zip(engagement) {
        let RawRecord::Employee { department, .. } = record else {
            continue;
        };
        // An absent or blank department label reads as unassigned
        let label = match department {
            Some(d) if !d.is_empty() => d.clone(),
            _ => UNASSIGNED_DEPARTMENT.to_string(),
        };

        let entry = accumulators.entry(label).or_default();
        entry.count += 1;
        entry.completion_sum += u64::from(measures.task_completion_rate);
        entry.videos_sum += u64::from(measures.videos_watched);
        if measures.is_engaged() && measures.is_recently_active(now) {
            entry.active += 1;
        }
    }

    accumulators
        .into_iter()
        .map(|(label, acc)| {
            let rollup = DepartmentRollup {
                employee_count: acc.count as u32,
                avg_completion: rounded_div(acc.completion_sum, acc.count),
                avg_videos_watched: rounded_div(acc.videos_sum, acc.count),
                engagement_rate: rounded_div(100 * acc.active, acc.count),
            };
            (label, rollup)
        })
        .collect()
}

// =========================================================================
// Tasks, videos, suggestions
// =========================================================================

/// Completed share of all tasks
fn global_completion_rate(tasks: &[&RawRecord]) -> u32 {
    let completed = tasks
        .iter()
        .filter(|t| matches!(t, RawRecord::Task { completed: true, .. }))
        .count();
    pct(completed, tasks.len())
}

/// Videos ranked by view count, descending. The sort is stable, so
/// videos with equal view counts keep their snapshot order.
fn video_rankings(videos: &[&RawRecord]) -> Vec<VideoRanking> {
    let mut rankings: Vec<VideoRanking> = videos
        .iter()
        .filter_map(|record| {
            let RawRecord::Video {
                id,
                title,
                views,
                likes,
                ..
            } = record
            else {
                return None;
            };

            let completed = views.iter().filter(|v| v.completed).count();
            Some(VideoRanking {
                video_id: id.clone(),
                title: title.clone(),
                views: views.len() as u32,
                likes: likes.len() as u32,
                completion_rate: pct(completed, views.len()),
            })
        })
        .collect();

    rankings.sort_by(|a, b| b.views.cmp(&a.views));
    rankings
}

/// Suggestion texts ranked by exact-text frequency, descending. The
/// sort is stable over first-seen order, so equal counts rank in the
/// order the texts first appeared.
fn suggestion_counts(suggestions: &[&RawRecord]) -> Vec<SuggestionCount> {
    let mut counts: Vec<SuggestionCount> = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for record in suggestions {
        let RawRecord::Suggestion { body, .. } = record else {
            continue;
        };
        match seen.get(body.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                seen.insert(body.as_str(), counts.len());
                counts.push(SuggestionCount {
                    body: body.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

// =========================================================================
// New hires
// =========================================================================

/// Employees hired within the calendar month containing `now`
fn new_hires(employees: &[&RawRecord], now: DateTime<Utc>) -> u32 {
    let (start, next) = month_window(now);
    employees
        .iter()
        .filter(|record| {
            matches!(
                record,
                RawRecord::Employee { hire_date: Some(d), .. } if *d >= start && *d < next
            )
        })
        .count() as u32
}

/// Half-open window [first day of current month, first day of next month)
fn month_window(now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let today = now.date_naive();
    let start = NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .expect("first day of a month is a valid date");
    let next = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    }
    .expect("first day of a month is a valid date");
    (start, next)
}
