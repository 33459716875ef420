//! Command-line front end for the search core.
//!
//! Streams matches to stdout as they settle, like the explorer's result list
//! fills in progressively.

use anyhow::{Context, Result, bail};
use std::sync::Arc;

use folio_search::{
    FsHost, SchedulerConfig, SearchEvent, SearchMode, SearchQuery, SearchScheduler,
};

const USAGE: &str = "usage: folio-search <path> <query> [--filename]";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let scope = args.next().context(USAGE)?;
    let text = args.next().context(USAGE)?;
    let mut mode = SearchMode::Content;
    for flag in args {
        match flag.as_str() {
            "--filename" => mode = SearchMode::Filename,
            other => bail!("unknown flag {other}\n{USAGE}"),
        }
    }

    let host = Arc::new(FsHost::new());
    let (scheduler, mut events) = SearchScheduler::new(host, SchedulerConfig::default());
    let run_id = scheduler
        .start(SearchQuery::new(text, mode, &scope))
        .await?;

    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::Result { run_id: id, result } if id == run_id => {
                for found in &result.matches {
                    match found.line {
                        Some(line) => {
                            println!("{}:{line}: {}", result.file_path, found.content.trim())
                        }
                        None => println!("{}", result.file_path),
                    }
                }
            }
            SearchEvent::Completed { run_id: id, summary } if id == run_id => {
                eprintln!(
                    "{} matches in {} files ({} ms)",
                    summary.total_matches, summary.total_files, summary.runtime_ms
                );
                break;
            }
            SearchEvent::Cancelled { run_id: id } if id == run_id => break,
            _ => {}
        }
    }

    Ok(())
}
