//! Search run orchestration.
//!
//! The scheduler dispatches per-file search operations against the host under
//! a bounded concurrency window (default 6). The pool is self-refilling: each
//! settle frees a permit for the next candidate, so throughput stays high even
//! when some files are slow. Cancellation is cooperative - a watch flag is
//! consulted before every dispatch and before every commit; operations already
//! in flight run to completion and their results are discarded.
//!
//! Exactly one run is current at a time. Starting a new search implicitly
//! cancels the previous run; its late settles are rejected by run id at the
//! aggregator.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock, Semaphore, mpsc, watch};
use tokio::task::JoinSet;

use super::aggregator::{ResultAggregator, UpdateDebouncer, UpdatePolicy};
use super::types::{
    RunId, RunStatus, SearchEvent, SearchProgress, SearchQuery, SearchResult,
};
use crate::error::SearchError;
use crate::host::{DirEntry, FileHost, FileSearchOutcome};

/// Default number of single-file operations in flight at once. Balances
/// worker-pool saturation against responsiveness of cancellation and
/// progress feedback.
pub const DEFAULT_CONCURRENCY: usize = 6;

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Concurrency window. 1 gives the strictly sequential fallback.
    pub concurrency: usize,
    /// Optional hardening bound: a dispatch that has not settled within this
    /// limit is treated as a failure and its slot freed. Off by default.
    pub per_file_timeout: Option<Duration>,
    pub update: UpdatePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            per_file_timeout: None,
            update: UpdatePolicy::default(),
        }
    }
}

/// Snapshot of the current run for the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRunInfo {
    pub id: RunId,
    pub query: SearchQuery,
    pub status: RunStatus,
    pub total_candidates: usize,
    pub completed_candidates: usize,
    pub total_lines: usize,
    pub runtime_ms: u64,
}

struct RunState {
    id: RunId,
    query: SearchQuery,
    status: RwLock<RunStatus>,
    cancel_tx: watch::Sender<bool>,
    total_candidates: AtomicUsize,
    completed_candidates: AtomicUsize,
    total_lines: AtomicUsize,
    started: Instant,
}

/// Orchestrates search runs against a [`FileHost`].
pub struct SearchScheduler<H: FileHost> {
    host: Arc<H>,
    config: SchedulerConfig,
    aggregator: Arc<ResultAggregator>,
    events: mpsc::UnboundedSender<SearchEvent>,
    current: Arc<Mutex<Option<Arc<RunState>>>>,
}

impl<H: FileHost> SearchScheduler<H> {
    /// Create a scheduler and the event stream its runs report on.
    pub fn new(
        host: Arc<H>,
        mut config: SchedulerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SearchEvent>) {
        if config.concurrency == 0 {
            log::warn!("scheduler concurrency of 0 raised to 1");
            config.concurrency = 1;
        }
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                host,
                config,
                aggregator: Arc::new(ResultAggregator::new()),
                events,
                current: Arc::new(Mutex::new(None)),
            },
            receiver,
        )
    }

    pub fn aggregator(&self) -> Arc<ResultAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Start a search: enumerate the scope, filter candidates, dispatch.
    pub async fn start(&self, query: SearchQuery) -> Result<RunId, SearchError> {
        query.validate()?;
        let entries = self.host.enumerate_files(&query.scope_path).await?;
        let candidates =
            filter_candidates(self.host.as_ref(), &entries, &query.scope_path).await;
        self.start_with_candidates(query, candidates).await
    }

    /// Start a search over an already-built candidate list.
    pub async fn start_with_candidates(
        &self,
        query: SearchQuery,
        candidates: Vec<String>,
    ) -> Result<RunId, SearchError> {
        query.validate()?;

        // Starting a new run implicitly cancels the previous one.
        {
            let mut current = self.current.lock().await;
            if let Some(previous) = current.take() {
                cancel_run(&previous, &self.events).await;
            }
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let run = Arc::new(RunState {
            id: RunId::new(),
            query: query.clone(),
            status: RwLock::new(RunStatus::Pending),
            cancel_tx,
            total_candidates: AtomicUsize::new(candidates.len()),
            completed_candidates: AtomicUsize::new(0),
            total_lines: AtomicUsize::new(0),
            started: Instant::now(),
        });

        self.aggregator.begin_run(run.id, &query.scope_path).await;
        *self.current.lock().await = Some(Arc::clone(&run));
        *run.status.write().await = RunStatus::Running;

        log::debug!(
            "starting search run {} over {} candidates (concurrency {})",
            run.id,
            candidates.len(),
            self.config.concurrency
        );

        // Candidates discovered: first progress report.
        let _ = self.events.send(SearchEvent::Progress {
            run_id: run.id,
            progress: progress_snapshot(&run, None),
        });

        tokio::spawn(drive_run(
            Arc::clone(&self.host),
            self.config,
            Arc::clone(&self.aggregator),
            self.events.clone(),
            Arc::clone(&run),
            candidates,
            cancel_rx,
        ));

        Ok(run.id)
    }

    /// Cancel a run. Returns false for unknown or already-finished runs.
    pub async fn cancel(&self, run_id: RunId) -> bool {
        let run = {
            let current = self.current.lock().await;
            match current.as_ref() {
                Some(run) if run.id == run_id => Arc::clone(run),
                _ => return false,
            }
        };
        cancel_run(&run, &self.events).await
    }

    /// Snapshot of the current (or most recent) run.
    pub async fn current_run(&self) -> Option<SearchRunInfo> {
        let current = self.current.lock().await;
        let run = current.as_ref()?;
        Some(SearchRunInfo {
            id: run.id,
            query: run.query.clone(),
            status: *run.status.read().await,
            total_candidates: run.total_candidates.load(Ordering::SeqCst),
            completed_candidates: run.completed_candidates.load(Ordering::SeqCst),
            total_lines: run.total_lines.load(Ordering::SeqCst),
            runtime_ms: run.started.elapsed().as_millis() as u64,
        })
    }
}

/// True when `path` lies inside `scope` (or equals it). Handles both
/// separator styles, so `/projectile` does not pass for scope `/project`.
pub fn path_in_scope(path: &str, scope: &str) -> bool {
    let scope = scope.trim_end_matches(['/', '\\']);
    if scope.is_empty() {
        return true;
    }
    path == scope
        || path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with(['/', '\\']))
}

/// Filter an enumerator listing down to search candidates: files only,
/// inside the scope, text-eligible.
pub async fn filter_candidates<H: FileHost>(
    host: &H,
    entries: &[DirEntry],
    scope: &str,
) -> Vec<String> {
    let mut candidates = Vec::new();
    for entry in entries {
        if entry.is_directory || !path_in_scope(&entry.path, scope) {
            continue;
        }
        if host.is_text_file(&entry.path).await {
            candidates.push(entry.path.clone());
        }
    }
    candidates
}

fn progress_snapshot(run: &RunState, current_file: Option<String>) -> SearchProgress {
    SearchProgress {
        total_candidates: run.total_candidates.load(Ordering::SeqCst),
        completed_candidates: run.completed_candidates.load(Ordering::SeqCst),
        total_lines: run.total_lines.load(Ordering::SeqCst),
        current_file,
    }
}

/// Flip a run to Cancelled: signal the flag, neutralize the counters for
/// display, notify the stream. The status lock serializes this against the
/// driver's completion transition.
async fn cancel_run(run: &RunState, events: &mpsc::UnboundedSender<SearchEvent>) -> bool {
    {
        let mut status = run.status.write().await;
        if matches!(*status, RunStatus::Completed | RunStatus::Cancelled) {
            return false;
        }
        *status = RunStatus::Cancelled;
    }
    let _ = run.cancel_tx.send(true);

    run.total_candidates.store(0, Ordering::SeqCst);
    run.completed_candidates.store(0, Ordering::SeqCst);
    run.total_lines.store(0, Ordering::SeqCst);

    let _ = events.send(SearchEvent::Progress {
        run_id: run.id,
        progress: SearchProgress::default(),
    });
    let _ = events.send(SearchEvent::Cancelled { run_id: run.id });
    log::info!("cancelled search run {}", run.id);
    true
}

type Settle = (String, Option<Result<FileSearchOutcome, SearchError>>);

/// Background driver for one run: fill the concurrency window, handle
/// settles as they land, detect completion when the queue and the pool are
/// both drained. Completion is settle-driven, never polled.
async fn drive_run<H: FileHost>(
    host: Arc<H>,
    config: SchedulerConfig,
    aggregator: Arc<ResultAggregator>,
    events: mpsc::UnboundedSender<SearchEvent>,
    run: Arc<RunState>,
    candidates: Vec<String>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut workers: JoinSet<Settle> = JoinSet::new();
    let mut debouncer = UpdateDebouncer::new(config.update);
    let mut committed_files = 0usize;

    let mut queue = candidates.into_iter();
    let mut next = queue.next();

    loop {
        if *cancel_rx.borrow() {
            break;
        }
        if next.is_none() && workers.is_empty() {
            break;
        }

        tokio::select! {
            permit = Arc::clone(&semaphore).acquire_owned(), if next.is_some() => {
                let Ok(permit) = permit else { break };
                if *cancel_rx.borrow() {
                    break;
                }
                if let Some(path) = next.take() {
                    next = queue.next();
                    let host = Arc::clone(&host);
                    let query = run.query.clone();
                    let cancel = cancel_rx.clone();
                    let timeout_limit = config.per_file_timeout;
                    workers.spawn(async move {
                        let _permit = permit;
                        if *cancel.borrow() {
                            return (path, None);
                        }
                        let outcome = match timeout_limit {
                            Some(limit) => {
                                match tokio::time::timeout(limit, host.search_file(&path, &query))
                                    .await
                                {
                                    Ok(result) => result,
                                    Err(_) => Err(SearchError::Other(anyhow::anyhow!(
                                        "single-file search stalled past {limit:?}"
                                    ))),
                                }
                            }
                            None => host.search_file(&path, &query).await,
                        };
                        (path, Some(outcome))
                    });
                }
            }
            settled = workers.join_next(), if !workers.is_empty() => {
                match settled {
                    Some(Ok((path, outcome))) => {
                        // Counters are frozen at zero once the run is cancelled.
                        let cancelled = *cancel_rx.borrow();
                        if !cancelled {
                            run.completed_candidates.fetch_add(1, Ordering::SeqCst);
                        }
                        match outcome {
                            // Worker saw the cancel flag before touching the file.
                            None => {}
                            Some(Err(err)) => {
                                // Zero matches for this file; the run goes on.
                                log::warn!("search failed for {path}: {err}");
                            }
                            Some(Ok(outcome)) => {
                                if !cancelled {
                                    run.total_lines
                                        .fetch_add(outcome.lines_scanned, Ordering::SeqCst);
                                    aggregator
                                        .add_lines_scanned(run.id, outcome.lines_scanned)
                                        .await;
                                    if !outcome.matches.is_empty() {
                                        let result = SearchResult::new(
                                            path.clone(),
                                            outcome.matches,
                                            outcome.modified,
                                        );
                                        if aggregator.on_result(run.id, result.clone()).await {
                                            committed_files += 1;
                                            let _ = events.send(SearchEvent::Result {
                                                run_id: run.id,
                                                result,
                                            });
                                        }
                                    }
                                }
                            }
                        }
                        if !cancelled && debouncer.should_emit(committed_files, Instant::now()) {
                            let _ = events.send(SearchEvent::Progress {
                                run_id: run.id,
                                progress: progress_snapshot(&run, Some(path)),
                            });
                        }
                    }
                    Some(Err(join_err)) => {
                        log::warn!("search worker panicked: {join_err}");
                        run.completed_candidates.fetch_add(1, Ordering::SeqCst);
                    }
                    None => {}
                }
            }
            changed = cancel_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // Loop around and re-check the flag.
            }
        }
    }

    if *cancel_rx.borrow() {
        // In-flight operations run to completion; their results are discarded.
        while workers.join_next().await.is_some() {}
        log::debug!("search run {} drained after cancellation", run.id);
        return;
    }

    {
        let mut status = run.status.write().await;
        if *status == RunStatus::Cancelled {
            return;
        }
        *status = RunStatus::Completed;
    }

    // Final progress report bypasses the debouncer so the bar lands on 100%.
    let _ = events.send(SearchEvent::Progress {
        run_id: run.id,
        progress: progress_snapshot(&run, None),
    });
    if let Some(summary) = aggregator.on_complete(run.id).await {
        log::info!(
            "search run {} complete: {} matches in {} files",
            run.id,
            summary.total_matches,
            summary.total_files
        );
        let _ = events.send(SearchEvent::Completed {
            run_id: run.id,
            summary,
        });
    }
}
