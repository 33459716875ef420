//! Host capability seam between the search core and the surrounding
//! application.
//!
//! The core never touches the filesystem directly; it consumes a directory
//! listing, a per-file search primitive and a full-content read through
//! [`FileHost`]. [`FsHost`] is the production implementation; tests substitute
//! their own.

use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::Path;
use std::time::{Instant, SystemTime};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::SearchError;
use crate::search::types::{FileMatch, SearchMode, SearchQuery, basename};

/// One entry from a recursive directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: String,
    pub is_directory: bool,
}

/// Outcome of searching a single file.
#[derive(Debug, Clone, Default)]
pub struct FileSearchOutcome {
    pub matches: Vec<FileMatch>,
    /// Lines read while scanning (0 for filename matches).
    pub lines_scanned: usize,
    pub search_time_ms: u64,
    pub modified: Option<SystemTime>,
}

/// Capabilities the search core consumes from the host application.
///
/// Each per-file search dispatch is an opaque asynchronous operation with its
/// own failure mode; the scheduler treats an `Err` as zero matches for that
/// file and keeps going.
#[async_trait]
pub trait FileHost: Send + Sync + 'static {
    /// Recursive listing of the subtree under `root`.
    async fn enumerate_files(&self, root: &str) -> Result<Vec<DirEntry>, SearchError>;

    /// Search one file for the query. May fail per-call.
    async fn search_file(
        &self,
        path: &str,
        query: &SearchQuery,
    ) -> Result<FileSearchOutcome, SearchError>;

    /// Full line-split content of a file, for the preview pane.
    async fn read_file_lines(&self, path: &str) -> Result<Vec<String>, SearchError>;

    /// Classification predicate: binary files are never searched.
    async fn is_text_file(&self, path: &str) -> bool;
}

/// Source/code extensions `mime_guess` maps to `application/octet-stream`.
const TEXT_EXTENSIONS: &[&str] = &[
    "bat", "cfg", "conf", "env", "gitignore", "go", "gradle", "h", "hpp", "ini", "kt", "lock",
    "log", "mdx", "nim", "properties", "ps1", "rs", "sbt", "scala", "sql", "svelte", "swift",
    "tf", "toml", "vue", "yaml", "yml", "zig",
];

fn looks_textual(path: &str) -> bool {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        return true;
    }
    match mime.essence_str() {
        "application/json" | "application/xml" | "application/javascript"
        | "application/x-sh" | "application/toml" | "application/yaml" => return true,
        _ => {}
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

/// Filesystem-backed host: `ignore` walker for enumeration, streamed
/// line reads for content search and preview.
#[derive(Debug, Clone, Default)]
pub struct FsHost;

impl FsHost {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileHost for FsHost {
    async fn enumerate_files(&self, root: &str) -> Result<Vec<DirEntry>, SearchError> {
        let root = root.to_string();
        // The walker is synchronous; run it on the blocking pool.
        let entries = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            for entry in WalkBuilder::new(&root).build() {
                match entry {
                    Ok(entry) => {
                        let is_directory =
                            entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                        out.push(DirEntry {
                            path: entry.path().to_string_lossy().into_owned(),
                            is_directory,
                        });
                    }
                    Err(err) => {
                        log::debug!("walk error under {root}: {err}");
                    }
                }
            }
            out
        })
        .await
        .map_err(|e| SearchError::Other(anyhow::anyhow!("directory walk task failed: {e}")))?;

        Ok(entries)
    }

    async fn search_file(
        &self,
        path: &str,
        query: &SearchQuery,
    ) -> Result<FileSearchOutcome, SearchError> {
        let started = Instant::now();
        let needle = query.trimmed_text().to_lowercase();
        let modified = tokio::fs::metadata(path)
            .await
            .ok()
            .and_then(|meta| meta.modified().ok());

        match query.mode {
            SearchMode::Filename => {
                let name = basename(path);
                let matches = if name.to_lowercase().contains(&needle) {
                    vec![FileMatch {
                        line: None,
                        content: name.to_string(),
                    }]
                } else {
                    Vec::new()
                };
                Ok(FileSearchOutcome {
                    matches,
                    lines_scanned: 0,
                    search_time_ms: started.elapsed().as_millis() as u64,
                    modified,
                })
            }
            SearchMode::Content => {
                let file = tokio::fs::File::open(path).await?;
                let reader = BufReader::new(file);
                let mut lines = reader.lines();

                let mut matches = Vec::new();
                let mut line_number: u32 = 0;
                while let Some(line) = lines.next_line().await? {
                    line_number += 1;
                    if line.to_lowercase().contains(&needle) {
                        matches.push(FileMatch {
                            line: Some(line_number),
                            content: line,
                        });
                    }
                }

                Ok(FileSearchOutcome {
                    matches,
                    lines_scanned: line_number as usize,
                    search_time_ms: started.elapsed().as_millis() as u64,
                    modified,
                })
            }
        }
    }

    async fn read_file_lines(&self, path: &str) -> Result<Vec<String>, SearchError> {
        if !looks_textual(path) {
            return Err(SearchError::NotPreviewable {
                path: path.to_string(),
            });
        }

        let file = tokio::fs::File::open(path).await?;
        let reader = BufReader::new(file);
        let mut stream = reader.lines();

        let mut lines = Vec::new();
        while let Some(line) = stream.next_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }

    async fn is_text_file(&self, path: &str) -> bool {
        looks_textual(path)
    }
}
