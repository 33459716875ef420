//! Core data model for search runs, results and progress events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

use crate::error::SearchError;

/// What the query text is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Content,
    Filename,
}

/// An immutable search request. Frozen once a run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
    /// Root of the subtree to search. May be narrower than the tree root.
    pub scope_path: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, mode: SearchMode, scope_path: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode,
            scope_path: scope_path.into(),
        }
    }

    /// Rejects empty/whitespace-only queries and missing scopes before any
    /// candidate is dispatched.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.text.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if self.scope_path.trim().is_empty() {
            return Err(SearchError::NoScope);
        }
        Ok(())
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

/// Unique identifier for one search run.
///
/// Results settle asynchronously, so every callback carries the id of the run
/// that dispatched it; callbacks from a stale run are dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Cancelled,
    Completed,
}

/// One matching line inside a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    /// 1-based line number. `None` for filename-only matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Raw line text (or the file name, for filename matches).
    pub content: String,
}

/// All matches found in a single file, keyed by `file_path` within a run.
///
/// Mutated only by merge-on-arrival: if the same path reports again, new
/// matches are appended, never replacing earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_path: String,
    pub file_name: String,
    pub matches: Vec<FileMatch>,

    /// File modification time, if the host could provide one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<SystemTime>,
}

impl SearchResult {
    pub fn new(
        file_path: impl Into<String>,
        matches: Vec<FileMatch>,
        modified: Option<SystemTime>,
    ) -> Self {
        let file_path = file_path.into();
        let file_name = basename(&file_path).to_string();
        Self {
            file_path,
            file_name,
            matches,
            modified,
        }
    }
}

/// Running progress counters for the active run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub total_candidates: usize,
    pub completed_candidates: usize,
    /// Lines scanned across all settled files so far.
    pub total_lines: usize,
    /// Most recently settled file, for the status bar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

/// Final statistics reported when a run completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub total_files: usize,
    pub total_matches: usize,
    pub runtime_ms: u64,
}

/// Events streamed to the UI layer while a run executes.
///
/// A tagged enum rather than a nullable payload, so completion is an explicit
/// variant consumers must handle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchEvent {
    Progress {
        run_id: RunId,
        progress: SearchProgress,
    },
    Result {
        run_id: RunId,
        result: SearchResult,
    },
    Completed {
        run_id: RunId,
        summary: SearchSummary,
    },
    Cancelled {
        run_id: RunId,
    },
}

/// Final path component, handling both `/` and `\` separators.
///
/// Paths arrive from multiple collaborators and are not guaranteed to use the
/// platform separator, so this never goes through `std::path`.
pub fn basename(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Parent directory of `path`, handling both `/` and `\` separators.
/// Empty string when the path has no separator.
pub fn dirname(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[..idx],
        None => "",
    }
}
