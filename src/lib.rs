//! Concurrent, cancellable file search core for a desktop file explorer.
//!
//! Three cooperating pieces:
//!
//! - [`search::SearchScheduler`] runs a query over a candidate list with a
//!   bounded concurrency window and cooperative cancellation;
//! - [`search::ResultAggregator`] collects streaming per-file results,
//!   rejects stale deliveries by run id, and derives sorted/grouped views;
//! - [`preview::PreviewLoader`] serves bounded line windows of matched files.
//!
//! The filesystem itself sits behind the [`host::FileHost`] trait, with
//! [`host::FsHost`] as the production implementation.

mod error;

pub mod history;
pub mod host;
pub mod preview;
pub mod search;

pub use error::SearchError;
pub use history::{HISTORY_LIMIT, KvStore, LastSearch, MemoryStore, SearchHistory};
pub use host::{DirEntry, FileHost, FileSearchOutcome, FsHost};
pub use preview::{
    PREVIEW_WINDOW, PageDirection, PreviewLoader, PreviewWindow, highlight_spans, window_bounds,
};
pub use search::{
    AggregateView, DEFAULT_CONCURRENCY, FileMatch, FolderGroup, ResultAggregator, RunId,
    RunStatus, SchedulerConfig, SearchEvent, SearchMode, SearchProgress, SearchQuery,
    SearchResult, SearchRunInfo, SearchScheduler, SearchSummary, SortDirection, SortKey,
    UpdatePolicy, ViewOptions,
};
