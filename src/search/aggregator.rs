//! Incremental aggregation of streaming per-file results.
//!
//! The aggregator owns the cumulative result set for the current run. Results
//! are committed in settlement order; every callback is tagged with a run id
//! and callbacks from a stale run are ignored. Views (sorting, grouping) are
//! derived on demand and never mutate the underlying set.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::sorting::{SortDirection, SortKey, default_direction, sort_results};
use super::types::{RunId, SearchResult, SearchSummary, dirname};

/// Options for deriving a view from the aggregate.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub sort_by: SortKey,
    /// `None` applies the key's default direction.
    pub direction: Option<SortDirection>,
    pub group_by_folder: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            sort_by: SortKey::Default,
            direction: None,
            group_by_folder: false,
        }
    }
}

/// Results sharing a parent directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderGroup {
    /// Full parent directory path.
    pub folder: String,
    /// Path relative to the search scope, `/` for the scope root itself.
    pub label: String,
    pub results: Vec<SearchResult>,
}

/// A derived snapshot of the aggregate. Recomputed per request, not stored.
#[derive(Debug, Clone)]
pub struct AggregateView {
    pub total_files: usize,
    pub total_matches: usize,
    pub total_lines: usize,
    pub results: Vec<SearchResult>,
    pub groups: Option<Vec<FolderGroup>>,
}

#[derive(Default)]
struct AggState {
    run_id: Option<RunId>,
    scope_path: String,
    /// Arrival order.
    results: Vec<SearchResult>,
    /// file_path -> index into `results`.
    index: HashMap<String, usize>,
    total_matches: usize,
    total_lines: usize,
    started: Option<Instant>,
    completed: bool,
}

/// Owns the cumulative result set for the active run.
///
/// All mutation happens under one write lock, so settle callbacks from
/// concurrent workers cannot race on the same `file_path` key.
#[derive(Default)]
pub struct ResultAggregator {
    state: RwLock<AggState>,
}

impl ResultAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retarget to a new run, discarding everything from the previous one.
    pub async fn begin_run(&self, run_id: RunId, scope_path: &str) {
        let mut state = self.state.write().await;
        *state = AggState {
            run_id: Some(run_id),
            scope_path: scope_path.to_string(),
            started: Some(Instant::now()),
            ..AggState::default()
        };
    }

    /// Commit a per-file result. Returns false (and commits nothing) when the
    /// run id is stale - an expected race, not a fault.
    pub async fn on_result(&self, run_id: RunId, result: SearchResult) -> bool {
        let mut state = self.state.write().await;
        if state.run_id != Some(run_id) {
            log::debug!("dropping stale result for run {run_id}: {}", result.file_path);
            return false;
        }

        state.total_matches += result.matches.len();
        match state.index.get(&result.file_path) {
            Some(&idx) => {
                // Same file reported again: append, never replace.
                state.results[idx].matches.extend(result.matches);
            }
            None => {
                let idx = state.results.len();
                state.index.insert(result.file_path.clone(), idx);
                state.results.push(result);
            }
        }
        true
    }

    /// Fold scanned-line counts into the running statistics.
    pub async fn add_lines_scanned(&self, run_id: RunId, lines: usize) -> bool {
        let mut state = self.state.write().await;
        if state.run_id != Some(run_id) {
            return false;
        }
        state.total_lines += lines;
        true
    }

    /// Number of distinct files with committed matches.
    pub async fn result_count(&self) -> usize {
        self.state.read().await.results.len()
    }

    /// Mark the run complete and compute the final statistics.
    /// `None` when the run id is no longer current.
    pub async fn on_complete(&self, run_id: RunId) -> Option<SearchSummary> {
        let mut state = self.state.write().await;
        if state.run_id != Some(run_id) {
            return None;
        }
        state.completed = true;
        Some(SearchSummary {
            total_files: state.results.len(),
            total_matches: state.total_matches,
            runtime_ms: state
                .started
                .map(|s| s.elapsed().as_millis() as u64)
                .unwrap_or(0),
        })
    }

    /// Derive a sorted (and optionally folder-grouped) view.
    ///
    /// Pure over the aggregate: repeated calls with the same options yield the
    /// same view, and no call mutates the underlying set.
    pub async fn get_view(&self, options: &ViewOptions) -> AggregateView {
        // One read guard for the whole derivation keeps counters and results
        // a consistent snapshot.
        let state = self.state.read().await;

        let direction = options
            .direction
            .unwrap_or_else(|| default_direction(options.sort_by));

        let mut results = state.results.clone();
        sort_results(&mut results, options.sort_by, direction);

        let groups = options.group_by_folder.then(|| {
            group_by_folder(&results, &state.scope_path, options.sort_by)
        });

        AggregateView {
            total_files: state.results.len(),
            total_matches: state.total_matches,
            total_lines: state.total_lines,
            results,
            groups,
        }
    }
}

/// Group results by parent directory, preserving group discovery order.
///
/// Within a group files stay in name order unless an explicit sort is active,
/// in which case the active order is kept.
fn group_by_folder(results: &[SearchResult], scope: &str, sort_by: SortKey) -> Vec<FolderGroup> {
    let mut groups: Vec<FolderGroup> = Vec::new();
    let mut by_folder: HashMap<String, usize> = HashMap::new();

    for result in results {
        let folder = dirname(&result.file_path).to_string();
        match by_folder.get(&folder) {
            Some(&idx) => groups[idx].results.push(result.clone()),
            None => {
                by_folder.insert(folder.clone(), groups.len());
                groups.push(FolderGroup {
                    label: relative_label(&folder, scope),
                    folder,
                    results: vec![result.clone()],
                });
            }
        }
    }

    if matches!(sort_by, SortKey::Default) {
        for group in &mut groups {
            group.results.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        }
    }

    groups
}

/// Folder label relative to the active search scope.
/// The scope root itself renders as `/`.
pub fn relative_label(folder: &str, scope: &str) -> String {
    let scope = scope.trim_end_matches(['/', '\\']);
    let stripped = if !scope.is_empty() && folder.starts_with(scope) {
        &folder[scope.len()..]
    } else {
        folder
    };
    let trimmed = stripped.trim_start_matches(['/', '\\']);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.replace('\\', "/")
    }
}

/// Batching policy for UI-facing update notifications.
///
/// Small result sets propagate immediately; past the threshold, updates are
/// coalesced so a large run does not thrash the renderer. Purely a pacing
/// accommodation - the final aggregate is always complete.
#[derive(Debug, Clone, Copy)]
pub struct UpdatePolicy {
    pub batch_threshold: usize,
    pub batch_delay: Duration,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            batch_threshold: 20,
            batch_delay: Duration::from_secs(1),
        }
    }
}

/// Decides, per settle, whether to emit a progress update now.
#[derive(Debug)]
pub struct UpdateDebouncer {
    policy: UpdatePolicy,
    last_emit: Option<Instant>,
}

impl UpdateDebouncer {
    #[must_use]
    pub fn new(policy: UpdatePolicy) -> Self {
        Self {
            policy,
            last_emit: None,
        }
    }

    /// `result_count` is the number of result files committed so far; `now`
    /// is injected for testability.
    pub fn should_emit(&mut self, result_count: usize, now: Instant) -> bool {
        if result_count < self.policy.batch_threshold {
            self.last_emit = Some(now);
            return true;
        }
        match self.last_emit {
            Some(prev) if now.duration_since(prev) < self.policy.batch_delay => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}
