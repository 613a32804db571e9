//! Dashboard Simulation Tool
//!
//! Run with: cargo run --bin simulate
//!
//! Seeds an in-memory document store, starts a live metrics session,
//! applies a few mutations, and runs a short chat exchange. Exercises
//! the whole engine end to end without an external backend.

use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onboardly_engine::chat::{ChatSession, MessageDraft, ParticipantId, RoomUpdate};
use onboardly_engine::domain::{Collection, DerivedMetrics, RawRecord, RecordId, VideoView};
use onboardly_engine::{
    AnalyticsSession, Config, DocumentStore, InMemoryStore, SubscriptionManager,
};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onboardly_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn employee(
    id: &str,
    name: &str,
    department: Option<&str>,
    hired_days_ago: i64,
    active_days_ago: Option<i64>,
) -> RawRecord {
    let now = Utc::now();
    RawRecord::Employee {
        id: RecordId::new(id),
        name: name.to_string(),
        email: format!("{id}@onboardly.dev"),
        role: "employee".to_string(),
        department: department.map(str::to_string),
        is_admin: false,
        hire_date: Some((now - Duration::days(hired_days_ago)).date_naive()),
        last_active: active_days_ago.map(|days| now - Duration::days(days)),
        auth_uid: Some(format!("uid-{id}")),
    }
}

fn task(id: &str, title: &str, assigned_to: &str, completed: bool) -> RawRecord {
    RawRecord::Task {
        id: RecordId::new(id),
        title: title.to_string(),
        description: String::new(),
        assigned_to: Some(RecordId::new(assigned_to)),
        completed,
        due_date: Some((Utc::now() + Duration::days(7)).date_naive()),
        video_link: None,
    }
}

fn video(id: &str, title: &str, views: &[(&str, bool)], likes: &[&str]) -> RawRecord {
    RawRecord::Video {
        id: RecordId::new(id),
        title: title.to_string(),
        url: format!("https://videos.onboardly.dev/{id}"),
        category: Some("onboarding".to_string()),
        description: String::new(),
        views: views
            .iter()
            .map(|(employee_id, completed)| VideoView {
                employee_id: RecordId::new(*employee_id),
                completed: *completed,
            })
            .collect(),
        likes: likes.iter().map(|id| RecordId::new(*id)).collect(),
    }
}

fn suggestion(id: &str, body: &str, submitted_by: &str) -> RawRecord {
    RawRecord::Suggestion {
        id: RecordId::new(id),
        body: body.to_string(),
        submitted_by: Some(RecordId::new(submitted_by)),
        submitted_at: Some(Utc::now()),
    }
}

async fn seed_store(store: &InMemoryStore) -> anyhow::Result<()> {
    let records = [
        employee("e1", "Ana Petrov", Some("Engineering"), 120, Some(1)),
        employee("e2", "Bo Lindqvist", Some("Engineering"), 0, Some(0)),
        employee("e3", "Caro Ellis", None, 60, Some(45)),
        task("t1", "Set up laptop", "e1", true),
        task("t2", "Meet the team", "e1", false),
        task("t3", "Read the handbook", "e2", false),
        task("t4", "Security training", "e3", true),
        video("v1", "Welcome tour", &[("e1", true), ("e2", false)], &["e1"]),
        video("v2", "Security basics", &[("e1", true)], &[]),
        suggestion("s1", "More pairing sessions", "e1"),
        suggestion("s2", "More pairing sessions", "e2"),
        suggestion("s3", "Faster laptop setup", "e3"),
    ];
    for record in records {
        store.append_record(record).await?;
    }
    Ok(())
}

fn print_dashboard(heading: &str, metrics: &DerivedMetrics) -> anyhow::Result<()> {
    println!("\n=== {heading} ===");
    println!("{}", serde_json::to_string_pretty(metrics)?);
    Ok(())
}

fn describe(update: Option<RoomUpdate>) -> String {
    match update {
        Some(RoomUpdate::Messages(log)) => log
            .iter()
            .map(|m| {
                let name = m.sender_name.as_deref().unwrap_or(m.sender.as_str());
                format!("  #{} {}: {}", m.seq, name, m.body)
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(RoomUpdate::Failed(error)) => format!("  <room feed failed: {error}>"),
        None => "  <room feed ended>".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "starting dashboard simulation");

    let store = Arc::new(InMemoryStore::new());
    seed_store(&store).await?;

    let manager = SubscriptionManager::with_capacity(store.clone(), config.feed_capacity);
    let mut session = AnalyticsSession::start(&manager).await?;
    let mut latest = session.latest_feed();

    // All four collections are seeded, so wait until every one has
    // landed in the projection
    let metrics = latest
        .wait_for(|m| {
            m.as_ref().is_some_and(|m| {
                m.engagement.len() == 3 && m.videos.len() == 2 && m.suggestions.len() == 2
            })
        })
        .await?
        .clone()
        .ok_or_else(|| anyhow::anyhow!("metrics feed closed before first publish"))?;
    print_dashboard("Initial dashboard", &metrics)?;

    // Live mutation: completing a task recomputes the dashboard
    println!("\n=== Completing task t2 ===");
    store
        .update_record(Collection::Tasks, &RecordId::new("t2"), |record| {
            if let RawRecord::Task { completed, .. } = record {
                *completed = true;
            }
        })
        .await?;
    let before = metrics.completion_rate;
    let metrics = latest
        .wait_for(|m| m.as_ref().is_some_and(|m| m.completion_rate != before))
        .await?
        .clone()
        .ok_or_else(|| anyhow::anyhow!("metrics feed closed"))?;
    println!(
        "Completion rate {}% -> {}%",
        before, metrics.completion_rate
    );

    // Live mutation: a new hire shows up in engagement and the
    // new-hires count
    println!("\n=== Hiring e4 ===");
    store
        .append_record(employee("e4", "Dana Okafor", Some("Design"), 0, Some(0)))
        .await?;
    let metrics = latest
        .wait_for(|m| m.as_ref().is_some_and(|m| m.engagement.len() == 4))
        .await?
        .clone()
        .ok_or_else(|| anyhow::anyhow!("metrics feed closed"))?;
    println!(
        "Employees: {}, new hires in {}-{:02}: {}",
        metrics.engagement.len(),
        Utc::now().year(),
        Utc::now().month(),
        metrics.new_hires_this_month
    );
    print_dashboard("Dashboard after mutations", &metrics)?;

    // Chat exchange: shared room first, then a direct room
    println!("\n=== Chat ===");
    let ana = ParticipantId::new("uid-e1")?;
    let bo = ParticipantId::new("uid-e2")?;

    let mut ana_chat = ChatSession::new(store.clone(), ana.clone());
    let ana_room = ana_chat.join_general().await?;
    println!("general, as seen by ana on join:\n{}", describe(ana_room.recv().await));
    ana_room
        .send(MessageDraft::new(ana.clone(), "Welcome to the team, Bo!").with_sender_name("Ana"))
        .await?;

    let mut bo_chat = ChatSession::new(store.clone(), bo.clone());
    let bo_room = bo_chat.join_general().await?;
    println!("general, as seen by bo on join:\n{}", describe(bo_room.recv().await));
    bo_room
        .send(MessageDraft::new(bo.clone(), "Thanks! Happy to be here.").with_sender_name("Bo"))
        .await?;
    println!("general, after bo replies:\n{}", describe(bo_room.recv().await));

    // Switching rooms detaches the shared feed before the direct one
    // opens
    let ana_direct = ana_chat.join_direct(&bo).await?;
    println!("direct room key: {}", ana_direct.room());
    ana_direct
        .send(MessageDraft::new(ana, "Lunch later?").with_sender_name("Ana"))
        .await?;
    let bo_direct = bo_chat.join_direct(&ParticipantId::new("uid-e1")?).await?;
    println!("direct, as seen by bo on join:\n{}", describe(bo_direct.recv().await));

    session.close();
    ana_chat.leave();
    bo_chat.leave();
    tracing::info!("feeds released, simulation complete");

    Ok(())
}
