//! Preview pane loading.
//!
//! Opening a search hit loads a bounded window of the file rather than the
//! whole content: at most [`PREVIEW_WINDOW`] lines, centered on the target
//! line when one is given. The full line buffer is retained while the file
//! stays open, so paging and jumps re-slice in memory; the buffer is released
//! on [`PreviewLoader::close`] or when a different file is opened.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::SearchError;
use crate::host::FileHost;

/// Maximum number of lines served per preview window.
pub const PREVIEW_WINDOW: usize = 300;

/// How long the target line stays visually flagged after a jump.
pub const TARGET_FLASH: std::time::Duration = std::time::Duration::from_millis(1500);

/// Paging direction for [`PreviewLoader::page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Forward,
    Backward,
}

/// A loaded slice of a file, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewWindow {
    pub path: String,
    /// 1-based number of the first line in `lines`.
    pub start_line: usize,
    pub lines: Vec<String>,
    /// Line count of the whole file, not just this window.
    pub total_lines: usize,
    /// The line to scroll to and flag, clamped into the window.
    pub target_line: Option<usize>,
    /// True when the file extends beyond this window.
    pub truncated: bool,
}

struct ActivePreview {
    path: String,
    /// Full line buffer, retained for re-slicing while the file is open.
    lines: Vec<String>,
    /// 1-based start of the window currently on screen.
    window_start: usize,
}

impl ActivePreview {
    fn slice(&self, start: usize, target_line: Option<usize>) -> PreviewWindow {
        let total = self.lines.len();
        let end = (start + PREVIEW_WINDOW - 1).min(total);
        let lines = if total == 0 {
            Vec::new()
        } else {
            self.lines[start - 1..end].to_vec()
        };
        PreviewWindow {
            path: self.path.clone(),
            start_line: start,
            lines,
            total_lines: total,
            target_line: target_line.map(|t| t.clamp(start, end.max(start))),
            truncated: total > PREVIEW_WINDOW,
        }
    }
}

/// Loads preview windows through the host and tracks the file the pane is
/// currently showing, so paging and jumps within the open file need only a
/// direction or a line number.
pub struct PreviewLoader<H: FileHost> {
    host: Arc<H>,
    active: RwLock<Option<ActivePreview>>,
}

impl<H: FileHost> PreviewLoader<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            active: RwLock::new(None),
        }
    }

    /// Open `path` in the preview pane, windowed around `target_line`. Any
    /// previously open file's buffer is released.
    pub async fn open(
        &self,
        path: &str,
        target_line: Option<usize>,
    ) -> Result<PreviewWindow, SearchError> {
        let lines = self.host.read_file_lines(path).await?;
        let (start, end) = window_bounds(lines.len(), target_line);
        log::debug!(
            "preview window for {path}: lines {start}..={end} of {}",
            lines.len()
        );

        let preview = ActivePreview {
            path: path.to_string(),
            lines,
            window_start: start,
        };
        let window = preview.slice(start, target_line);
        *self.active.write().await = Some(preview);
        Ok(window)
    }

    /// Step the window one page forward or backward, clamped to the file.
    pub async fn page(&self, direction: PageDirection) -> Result<PreviewWindow, SearchError> {
        let mut active = self.active.write().await;
        let preview = active.as_mut().ok_or(SearchError::NoActivePreview)?;

        let max_start = preview.lines.len().saturating_sub(PREVIEW_WINDOW) + 1;
        let start = match direction {
            PageDirection::Forward => (preview.window_start + PREVIEW_WINDOW).min(max_start),
            PageDirection::Backward => preview.window_start.saturating_sub(PREVIEW_WINDOW).max(1),
        };
        preview.window_start = start;
        Ok(preview.slice(start, None))
    }

    /// Re-window the open file around a different line.
    pub async fn jump(&self, target_line: usize) -> Result<PreviewWindow, SearchError> {
        let mut active = self.active.write().await;
        let preview = active.as_mut().ok_or(SearchError::NoActivePreview)?;

        let (start, _) = window_bounds(preview.lines.len(), Some(target_line));
        preview.window_start = start;
        Ok(preview.slice(start, Some(target_line)))
    }

    /// Release the retained buffer.
    pub async fn close(&self) {
        *self.active.write().await = None;
    }

    pub async fn active_path(&self) -> Option<String> {
        self.active.read().await.as_ref().map(|a| a.path.clone())
    }
}

/// 1-based inclusive window bounds for a file of `total` lines.
///
/// Small files are served whole. For large files the window is centered on
/// the target (half the window above it) and re-clamped at both ends, so a
/// target near the tail still yields a full window.
pub fn window_bounds(total: usize, target: Option<usize>) -> (usize, usize) {
    if total <= PREVIEW_WINDOW {
        return (1, total);
    }
    let Some(target) = target else {
        return (1, PREVIEW_WINDOW);
    };
    let target = target.clamp(1, total);
    let start = target.saturating_sub(PREVIEW_WINDOW / 2).max(1);
    let end = (start + PREVIEW_WINDOW - 1).min(total);
    let start = end.saturating_sub(PREVIEW_WINDOW - 1).max(1);
    (start, end)
}

/// Byte ranges of `needle` within `line`, matched case-insensitively as a
/// literal. Non-overlapping, left to right. Used to paint match highlights.
pub fn highlight_spans(line: &str, needle: &str) -> Vec<(usize, usize)> {
    if needle.is_empty() {
        return Vec::new();
    }
    let pattern = format!("(?i){}", regex::escape(needle));
    let Ok(matcher) = regex::Regex::new(&pattern) else {
        return Vec::new();
    };
    matcher
        .find_iter(line)
        .map(|found| (found.start(), found.end()))
        .collect()
}
