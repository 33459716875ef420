//! End-to-end search flows over a real temporary directory tree.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use folio_search::{
    FsHost, PreviewLoader, RunId, SchedulerConfig, SearchEvent, SearchMode, SearchQuery,
    SearchScheduler, SearchSummary, SortDirection, SortKey, ViewOptions,
};

/// Builds the sample tree:
///   project/
///     a.txt       (two lines with "foo")
///     img.png     (binary, never searched)
///     b/
///       b1.txt    (no match)
///       b2.txt    (one line with "foo")
fn sample_tree() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::create_dir(dir.path().join("b")).expect("mkdir");
    std::fs::write(
        dir.path().join("a.txt"),
        "foo at the top\nnothing here\nand foo again\n",
    )
    .expect("write a.txt");
    std::fs::write(dir.path().join("img.png"), [0x89u8, 0x50, 0x4e, 0x47]).expect("write png");
    std::fs::write(dir.path().join("b/b1.txt"), "plain text only\n").expect("write b1");
    std::fs::write(dir.path().join("b/b2.txt"), "tail line has foo\n").expect("write b2");
    dir
}

async fn wait_for_completed(
    events: &mut mpsc::UnboundedReceiver<SearchEvent>,
    run_id: RunId,
) -> SearchSummary {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("timed out waiting for completion")
            .expect("event stream closed");
        if let SearchEvent::Completed {
            run_id: id,
            summary,
        } = event
        {
            assert_eq!(id, run_id);
            return summary;
        }
    }
}

#[tokio::test]
async fn content_search_finds_matches_across_the_tree() {
    let dir = sample_tree();
    let scope = dir.path().to_string_lossy().into_owned();

    let (scheduler, mut events) = SearchScheduler::new(
        Arc::new(FsHost::new()),
        SchedulerConfig {
            concurrency: 2,
            ..SchedulerConfig::default()
        },
    );
    let run_id = scheduler
        .start(SearchQuery::new("foo", SearchMode::Content, &scope))
        .await
        .expect("start");
    let summary = wait_for_completed(&mut events, run_id).await;

    assert_eq!(summary.total_files, 2);
    assert_eq!(summary.total_matches, 3);

    let view = scheduler
        .aggregator()
        .get_view(&ViewOptions {
            sort_by: SortKey::Matches,
            direction: Some(SortDirection::Descending),
            group_by_folder: false,
        })
        .await;
    assert_eq!(view.results[0].file_name, "a.txt");
    assert_eq!(view.results[0].matches.len(), 2);
    assert_eq!(view.results[1].file_name, "b2.txt");
    assert!(view.total_lines > 0);
}

#[tokio::test]
async fn grouped_view_labels_folders_relative_to_scope() {
    let dir = sample_tree();
    let scope = dir.path().to_string_lossy().into_owned();

    let (scheduler, mut events) =
        SearchScheduler::new(Arc::new(FsHost::new()), SchedulerConfig::default());
    let run_id = scheduler
        .start(SearchQuery::new("foo", SearchMode::Content, &scope))
        .await
        .expect("start");
    wait_for_completed(&mut events, run_id).await;

    let view = scheduler
        .aggregator()
        .get_view(&ViewOptions {
            sort_by: SortKey::Default,
            direction: None,
            group_by_folder: true,
        })
        .await;

    let groups = view.groups.expect("grouping requested");
    assert_eq!(groups.len(), 2);
    let mut labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
    labels.sort_unstable();
    assert_eq!(labels, vec!["/", "b"]);

    let scope_group = groups.iter().find(|g| g.label == "/").expect("root group");
    assert_eq!(scope_group.results[0].file_name, "a.txt");
    let sub_group = groups.iter().find(|g| g.label == "b").expect("sub group");
    assert_eq!(sub_group.results[0].file_name, "b2.txt");
}

#[tokio::test]
async fn filename_search_matches_names_without_reading_content() {
    let dir = sample_tree();
    let scope = dir.path().to_string_lossy().into_owned();

    let (scheduler, mut events) =
        SearchScheduler::new(Arc::new(FsHost::new()), SchedulerConfig::default());
    let run_id = scheduler
        .start(SearchQuery::new("b1", SearchMode::Filename, &scope))
        .await
        .expect("start");
    let summary = wait_for_completed(&mut events, run_id).await;

    assert_eq!(summary.total_files, 1);
    let view = scheduler.aggregator().get_view(&ViewOptions::default()).await;
    assert_eq!(view.results[0].file_name, "b1.txt");
    assert_eq!(view.results[0].matches[0].line, None);
}

#[tokio::test]
async fn restarting_replaces_the_previous_aggregate() {
    let dir = sample_tree();
    let scope = dir.path().to_string_lossy().into_owned();

    let (scheduler, mut events) =
        SearchScheduler::new(Arc::new(FsHost::new()), SchedulerConfig::default());

    let first = scheduler
        .start(SearchQuery::new("foo", SearchMode::Content, &scope))
        .await
        .expect("start first");
    let second = scheduler
        .start(SearchQuery::new("plain", SearchMode::Content, &scope))
        .await
        .expect("start second");
    assert_ne!(first, second);

    let summary = wait_for_completed(&mut events, second).await;
    assert_eq!(summary.total_files, 1);

    let view = scheduler.aggregator().get_view(&ViewOptions::default()).await;
    assert_eq!(view.total_files, 1);
    assert_eq!(view.results[0].file_name, "b1.txt");
}

#[tokio::test]
async fn preview_serves_matched_file_around_the_hit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    let body: String = (1..=40).map(|i| format!("line {i}\n")).collect();
    std::fs::write(&path, body).expect("write");

    let loader = PreviewLoader::new(Arc::new(FsHost::new()));
    let window = loader
        .open(&path.to_string_lossy(), Some(25))
        .await
        .expect("open");

    assert_eq!(window.start_line, 1);
    assert_eq!(window.total_lines, 40);
    assert_eq!(window.lines[24], "line 25");
    assert_eq!(window.target_line, Some(25));
    assert!(!window.truncated);
}
