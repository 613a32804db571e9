//! Analytics session
//!
//! Wires the four collection feeds into one notification loop driving
//! the metrics projection. A session owns its feed references: closing
//! it releases all four synchronously and stops the loop. A single
//! failed feed is surfaced and the session keeps computing from the
//! remaining ones; re-subscribing is the caller's decision.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::domain::{Collection, DerivedMetrics};
use crate::error::EngineResult;
use crate::projection::{MetricsProjection, DEFAULT_METRICS_CAPACITY};
use crate::store::StoreError;
use crate::subscription::{FeedGuard, FeedStream, FeedUpdate, SubscriptionManager};

/// Clock injection point for the computation passes
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A collection feed failure observed by a session
#[derive(Debug, Clone)]
pub struct FeedFailure {
    pub collection: Collection,
    pub error: Arc<StoreError>,
}

fn lock_failures(failures: &Mutex<Vec<FeedFailure>>) -> MutexGuard<'_, Vec<FeedFailure>> {
    failures.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One consumer's live view of the derived metrics
#[derive(Debug)]
pub struct AnalyticsSession {
    guards: Vec<FeedGuard>,
    pump: JoinHandle<()>,
    metrics_tx: broadcast::Sender<Arc<DerivedMetrics>>,
    latest_rx: watch::Receiver<Option<Arc<DerivedMetrics>>>,
    failures: Arc<Mutex<Vec<FeedFailure>>>,
    closed: bool,
}

impl AnalyticsSession {
    /// Start a session on the real clock
    pub async fn start(manager: &SubscriptionManager) -> EngineResult<Self> {
        Self::start_with_clock(manager, Arc::new(Utc::now)).await
    }

    /// Start a session with an injected clock. Every computation pass
    /// reads `now` from it, so tests can pin time.
    pub async fn start_with_clock(
        manager: &SubscriptionManager,
        clock: Clock,
    ) -> EngineResult<Self> {
        // A failure part-way drops the guards opened so far, which
        // releases their feeds
        let (employees, employees_guard) =
            manager.subscribe(Collection::Employees, None).await?.into_parts();
        let (tasks, tasks_guard) =
            manager.subscribe(Collection::Tasks, None).await?.into_parts();
        let (videos, videos_guard) =
            manager.subscribe(Collection::Videos, None).await?.into_parts();
        let (suggestions, suggestions_guard) =
            manager.subscribe(Collection::Suggestions, None).await?.into_parts();

        let projection = MetricsProjection::new(DEFAULT_METRICS_CAPACITY);
        let metrics_tx = projection.publisher();
        let (latest_tx, latest_rx) = watch::channel(None);
        let failures = Arc::new(Mutex::new(Vec::new()));

        let pump = tokio::spawn(
            NotificationLoop {
                projection,
                employees,
                tasks,
                videos,
                suggestions,
                latest_tx,
                failures: Arc::clone(&failures),
                clock,
            }
            .run(),
        );

        tracing::debug!("analytics session started");
        Ok(Self {
            guards: vec![employees_guard, tasks_guard, videos_guard, suggestions_guard],
            pump,
            metrics_tx,
            latest_rx,
            failures,
            closed: false,
        })
    }

    /// Most recently published metrics, retained after close
    pub fn latest(&self) -> Option<Arc<DerivedMetrics>> {
        self.latest_rx.borrow().clone()
    }

    /// Watch handle on the latest metrics. Starts at the current value,
    /// so `wait_for` never races a publish.
    pub fn latest_feed(&self) -> watch::Receiver<Option<Arc<DerivedMetrics>>> {
        self.latest_rx.clone()
    }

    /// Stream of every metrics publish after this call. Combine with
    /// [`latest`](Self::latest) for the current value.
    pub fn metrics_feed(&self) -> broadcast::Receiver<Arc<DerivedMetrics>> {
        self.metrics_tx.subscribe()
    }

    /// Collection feed failures observed so far
    pub fn feed_failures(&self) -> Vec<FeedFailure> {
        lock_failures(&self.failures).clone()
    }

    /// Release all four feeds and stop the loop. Synchronous and
    /// idempotent; dropping the session closes too.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for guard in &mut self.guards {
            guard.release();
        }
        self.pump.abort();
        tracing::debug!("analytics session closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for AnalyticsSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// The session's single notification loop. Owning all four streams in
/// one task keeps the projection single-writer without locking.
struct NotificationLoop {
    projection: MetricsProjection,
    employees: FeedStream,
    tasks: FeedStream,
    videos: FeedStream,
    suggestions: FeedStream,
    latest_tx: watch::Sender<Option<Arc<DerivedMetrics>>>,
    failures: Arc<Mutex<Vec<FeedFailure>>>,
    clock: Clock,
}

impl NotificationLoop {
    async fn run(mut self) {
        let mut employees_live = true;
        let mut tasks_live = true;
        let mut videos_live = true;
        let mut suggestions_live = true;

        while employees_live || tasks_live || videos_live || suggestions_live {
            tokio::select! {
                update = self.employees.recv(), if employees_live => {
                    match update {
                        Some(update) => self.handle(Collection::Employees, update),
                        None => employees_live = false,
                    }
                }
                update = self.tasks.recv(), if tasks_live => {
                    match update {
                        Some(update) => self.handle(Collection::Tasks, update),
                        None => tasks_live = false,
                    }
                }
                update = self.videos.recv(), if videos_live => {
                    match update {
                        Some(update) => self.handle(Collection::Videos, update),
                        None => videos_live = false,
                    }
                }
                update = self.suggestions.recv(), if suggestions_live => {
                    match update {
                        Some(update) => self.handle(Collection::Suggestions, update),
                        None => suggestions_live = false,
                    }
                }
            }
        }

        tracing::debug!("all collection feeds closed, notification loop done");
    }

    fn handle(&mut self, collection: Collection, update: FeedUpdate) {
        match update {
            FeedUpdate::Snapshot(snapshot) => {
                let was_primed = self.projection.is_primed();
                if let Some(metrics) = self.projection.apply(snapshot, (self.clock)()) {
                    let _ = self.latest_tx.send(Some(metrics));
                }
                if !was_primed && self.projection.is_primed() {
                    tracing::info!("all collection feeds primed");
                }
            }
            FeedUpdate::Failed(error) => {
                tracing::error!(
                    collection = %collection,
                    error = %error,
                    "collection feed failed, continuing on remaining feeds"
                );
                lock_failures(&self.failures).push(FeedFailure { collection, error });
            }
        }
    }
}
