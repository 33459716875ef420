use crate::search::types::RunId;

/// Errors produced by the search core.
///
/// User-facing rejections (`EmptyQuery`, `NoScope`) are distinguished from
/// I/O failures so the UI layer can show a warning instead of an error pane.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search query is empty")]
    EmptyQuery,

    #[error("no search scope selected")]
    NoScope,

    #[error("search run {0} not found")]
    RunNotFound(RunId),

    #[error("no file is loaded in the preview")]
    NoActivePreview,

    #[error("file is not previewable: {path}")]
    NotPreviewable { path: String },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// True for rejections the UI should surface as a warning, not an error.
    pub fn is_user_warning(&self) -> bool {
        matches!(self, Self::EmptyQuery | Self::NoScope)
    }
}
