//! Global search core: run scheduling, result aggregation, sorting.

pub mod aggregator;
pub mod scheduler;
pub mod sorting;
pub mod types;

pub use aggregator::{
    AggregateView, FolderGroup, ResultAggregator, UpdateDebouncer, UpdatePolicy, ViewOptions,
};
pub use scheduler::{
    DEFAULT_CONCURRENCY, SchedulerConfig, SearchRunInfo, SearchScheduler, filter_candidates,
    path_in_scope,
};
pub use sorting::{SortDirection, SortKey, default_direction, sort_results};
pub use types::{
    FileMatch, RunId, RunStatus, SearchEvent, SearchMode, SearchProgress, SearchQuery,
    SearchResult, SearchSummary, basename, dirname,
};
